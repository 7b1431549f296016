use crate::jvm::Error;
use std::fmt;
use std::str::FromStr;

/// Identity of whoever requested an operation, written `namespace:path`
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Id {
    namespace: String,
    path: String,
}

impl Id {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Result<Id, Error> {
        let namespace = namespace.into();
        let path = path.into();
        Id::check_part(&namespace, "namespace", false)?;
        Id::check_part(&path, "path", true)?;
        Ok(Id { namespace, path })
    }

    /// Parse `namespace:path`
    pub fn parse(id: &str) -> Result<Id, Error> {
        match id.split_once(':') {
            Some((namespace, path)) => Id::new(namespace, path),
            None => Err(Error::MalformedName(format!(
                "id '{}' is missing a namespace",
                id
            ))),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn check_part(part: &str, what: &str, allow_slash: bool) -> Result<(), Error> {
        if part.is_empty() {
            return Err(Error::MalformedName(format!("id {} is empty", what)));
        }
        let valid = |c: char| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.') || (allow_slash && c == '/')
        };
        match part.chars().find(|c| !valid(*c)) {
            None => Ok(()),
            Some(c) => Err(Error::MalformedName(format!(
                "id {} '{}' contains illegal character '{}'",
                what, part, c
            ))),
        }
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Id, Error> {
        Id::parse(s)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
