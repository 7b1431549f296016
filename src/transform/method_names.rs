use crate::jvm::{Error, Name, UnqualifiedName};
use crate::transform::Id;
use std::collections::HashSet;

/// Method names already taken in one class, used to hand out fresh names for generated methods
#[derive(Clone, Debug)]
pub struct MethodNames {
    prefix: UnqualifiedName,
    taken: HashSet<UnqualifiedName>,
}

impl MethodNames {
    pub fn new(prefix: UnqualifiedName) -> MethodNames {
        MethodNames {
            prefix,
            taken: HashSet::new(),
        }
    }

    /// Mark a name as taken (eg. by a method the class already declares)
    ///
    /// Returns `false` if it was already taken.
    pub fn reserve(&mut self, name: UnqualifiedName) -> bool {
        self.taken.insert(name)
    }

    pub fn is_taken(&self, name: &UnqualifiedName) -> bool {
        self.taken.contains(name)
    }

    /// Produce a name `{prefix}${purpose}${namespace}${path}` not used by anything else
    ///
    /// Characters of the owner that can't appear in method names become `_`. When the name is
    /// already taken, `_0`, `_1`, ... are tried in turn.
    pub fn create_unique(&mut self, purpose: &str, owner: &Id) -> Result<UnqualifiedName, Error> {
        let ideal = format!(
            "{}${}${}${}",
            self.prefix,
            purpose,
            sanitize(owner.namespace()),
            sanitize(owner.path())
        );
        UnqualifiedName::check_valid(&ideal).map_err(Error::MalformedName)?;

        let mut candidate = ideal.clone();
        let mut suffix = 0;
        loop {
            let name = UnqualifiedName::from_string(candidate).map_err(Error::MalformedName)?;
            if self.taken.insert(name.clone()) {
                return Ok(name);
            }
            candidate = format!("{}_{}", ideal, suffix);
            suffix += 1;
        }
    }
}

fn sanitize(part: &str) -> String {
    part.replace(&['.', '/'][..], "_")
}
