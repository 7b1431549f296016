mod harness;

use harness::*;
use sushi::code::*;
use sushi::jvm::*;
use sushi::transform::*;

/// `static void run(int x) { x = x + 1; }`
fn increment() -> TransformableCode {
    let mut method = MethodBuilder::new("(I)V", true);
    let start = method.label();
    method
        .push(Instruction::Load(TypeKind::Int, 0))
        .push(Instruction::IConst1)
        .push(Instruction::IAdd)
        .push(Instruction::Store(TypeKind::Int, 0));
    let end = method.label();
    method.push(Instruction::Return(None));
    method.local(0, "x", "I", start, end);
    method.build(1)
}

fn operation_descriptor(parameters: &str) -> String {
    format!("indy ({})L{};", parameters, Settings::new().operation_interface)
}

#[test]
fn written_locals_go_through_holders() {
    init_logging();
    let code = increment();
    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    let name = code
        .select(id("test:increment"))
        .from(Point::before(1))
        .to(Point::after(4))
        .unwrap()
        .extract(
            &mut operations,
            "wrap",
            StackDelta::method_like(vec![], None),
            call_and_pop,
        )
        .unwrap();
    assert_eq!(name.as_str(), "sushi$wrap$test$increment");

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    assert_eq!(rewritten.max_locals, 2);

    let mut expected = strings(&[
        "Label(L0)",
        "new IntRefImpl",
        "Dup",
        "Load(Int, 0)",
        "invoke IntRefImpl.<init>",
        "Store(Reference, 1)",
        "Load(Reference, 1)",
    ]);
    expected.push(operation_descriptor(
        "Lfish/cichlidmc/sushi/impl/ref/runtime/IntRefImpl;",
    ));
    expected.extend(call_and_pop_shape());
    expected.extend(strings(&[
        "Load(Reference, 1)",
        "invoke IntRefImpl.get",
        "Store(Int, 0)",
        "Load(Reference, 1)",
        "invoke IntRefImpl.discard",
        "Label(L1)",
        "Return(None)",
    ]));
    let actual = shape(&rewritten.elements);
    assert_eq!(actual[..expected.len()], expected[..]);
    assert_eq!(actual.len(), expected.len() + 1);

    let generated = &rewritten.generated[0];
    assert_eq!(generated.name, name);
    assert_eq!(generated.access_flags, settings.generated_method_flags);
    assert_eq!(
        generated.descriptor.to_string(),
        "(Lfish/cichlidmc/sushi/impl/ref/runtime/IntRefImpl;[Ljava/lang/Object;)Ljava/lang/Void;"
    );
    assert_eq!(generated.max_locals, 2);
    assert_eq!(
        shape(&generated.elements),
        strings(&[
            "Load(Reference, 1)",
            "IConst0",
            "invoke OperationInfra.checkCount",
            "Load(Reference, 0)",
            "invoke IntRefImpl.get",
            "IConst1",
            "IAdd",
            "Load(Reference, 0)",
            "invoke IntRefImpl.set",
            "AConstNull",
            "Return(Some(Reference))",
        ])
    );
}

#[test]
fn read_only_locals_are_passed_directly() {
    init_logging();
    let code = increment();
    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    code.select(id("test:read"))
        .from(Point::before(1))
        .to(Point::after(3))
        .unwrap()
        .extract(
            &mut operations,
            "sum",
            StackDelta::method_like(vec![], Some(FieldType::int())),
            call_and_pop,
        )
        .unwrap();

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    assert_eq!(rewritten.max_locals, 1);

    let mut expected = strings(&["Label(L0)", "Load(Int, 0)"]);
    expected.push(operation_descriptor("I"));
    expected.extend(call_and_pop_shape());
    expected.push(String::from("Store(Int, 0)"));
    assert_eq!(shape(&rewritten.elements)[..expected.len()], expected[..]);

    let generated = &rewritten.generated[0];
    assert_eq!(
        generated.descriptor.to_string(),
        "(I[Ljava/lang/Object;)Ljava/lang/Integer;"
    );
    assert_eq!(
        shape(&generated.elements),
        strings(&[
            "Load(Reference, 1)",
            "IConst0",
            "invoke OperationInfra.checkCount",
            "Load(Int, 0)",
            "IConst1",
            "IAdd",
            "invoke Integer.valueOf",
            "Return(Some(Reference))",
        ])
    );
}

#[test]
fn popped_values_are_unpacked() {
    init_logging();
    let mut method = MethodBuilder::new("()V", true);
    method
        .push(Instruction::IConst5)
        .push(Instruction::IConst1)
        .push(Instruction::IAdd)
        .push(Instruction::Pop)
        .push(Instruction::Return(None));
    let code = method.build(0);

    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    let add = code.get(2).unwrap();
    code.select(id("test:add"))
        .only(add)
        .extract(
            &mut operations,
            "add",
            StackDelta::method_like(vec![FieldType::int(), FieldType::int()], Some(FieldType::int())),
            call_and_pop,
        )
        .unwrap();

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    let generated = &rewritten.generated[0];
    assert_eq!(
        generated.descriptor.to_string(),
        "([Ljava/lang/Object;)Ljava/lang/Integer;"
    );
    assert_eq!(
        shape(&generated.elements),
        strings(&[
            "Load(Reference, 0)",
            "IConst2",
            "invoke OperationInfra.checkCount",
            "Load(Reference, 0)",
            "IConst0",
            "AALoad",
            "CheckCast(Object(java/lang/Number))",
            "invoke Number.intValue",
            "Load(Reference, 0)",
            "IConst1",
            "AALoad",
            "CheckCast(Object(java/lang/Number))",
            "invoke Number.intValue",
            "IAdd",
            "invoke Integer.valueOf",
            "Return(Some(Reference))",
        ])
    );
}

#[test]
fn private_locals_are_renumbered() {
    init_logging();
    let mut method = MethodBuilder::new("()V", true);
    method
        .push(Instruction::IConst5)
        .push(Instruction::Store(TypeKind::Int, 0));
    let start = method.label();
    method
        .push(Instruction::Load(TypeKind::Int, 0))
        .push(Instruction::Pop);
    let end = method.label();
    method.push(Instruction::Return(None));
    method.local(0, "y", "I", start, end);
    let code = method.build(1);

    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    code.select(id("test:private"))
        .from(Point::before(0))
        .to(Point::after(5))
        .unwrap()
        .extract(
            &mut operations,
            "private",
            StackDelta::method_like(vec![], None),
            call_and_pop,
        )
        .unwrap();

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    assert_eq!(rewritten.max_locals, 1);

    let mut expected = strings(&["Label(L0)", "Label(L1)"]);
    expected.push(operation_descriptor(""));
    expected.extend(call_and_pop_shape());
    expected.push(String::from("Return(None)"));
    assert_eq!(shape(&rewritten.elements)[..expected.len()], expected[..]);

    let generated = &rewritten.generated[0];
    assert_eq!(generated.descriptor.to_string(), "([Ljava/lang/Object;)Ljava/lang/Void;");
    assert_eq!(generated.max_locals, 2);
    assert_eq!(
        shape(&generated.elements),
        strings(&[
            "Load(Reference, 0)",
            "IConst0",
            "invoke OperationInfra.checkCount",
            "IConst5",
            "Store(Int, 1)",
            "Label(L0)",
            "Load(Int, 1)",
            "Pop",
            "Label(L1)",
            "AConstNull",
            "Return(Some(Reference))",
        ])
    );
}

#[test]
fn locals_assigned_for_later_are_written_back() {
    init_logging();
    let mut method = MethodBuilder::new("()V", true);
    method
        .push(Instruction::IConst5)
        .push(Instruction::Store(TypeKind::Int, 0));
    let start = method.label();
    method
        .push(Instruction::Load(TypeKind::Int, 0))
        .push(Instruction::Pop);
    let end = method.label();
    method.push(Instruction::Return(None));
    method.local(0, "y", "I", start, end);
    let code = method.build(1);

    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    code.select(id("test:assign"))
        .from(Point::before(0))
        .to(Point::after(1))
        .unwrap()
        .extract(
            &mut operations,
            "assign",
            StackDelta::method_like(vec![], None),
            call_and_pop,
        )
        .unwrap();

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    assert_eq!(rewritten.max_locals, 2);

    // The holder starts out empty, since `y` has no value yet
    let mut expected = strings(&[
        "new IntRefImpl",
        "Dup",
        "invoke IntRefImpl.<init>",
        "Store(Reference, 1)",
        "Load(Reference, 1)",
    ]);
    expected.push(operation_descriptor(
        "Lfish/cichlidmc/sushi/impl/ref/runtime/IntRefImpl;",
    ));
    expected.extend(call_and_pop_shape());
    expected.extend(strings(&[
        "Load(Reference, 1)",
        "invoke IntRefImpl.get",
        "Store(Int, 0)",
        "Load(Reference, 1)",
        "invoke IntRefImpl.discard",
        "Label(L0)",
        "Load(Int, 0)",
    ]));
    assert_eq!(shape(&rewritten.elements)[..expected.len()], expected[..]);

    let generated = &rewritten.generated[0];
    assert_eq!(
        generated.descriptor.to_string(),
        "(Lfish/cichlidmc/sushi/impl/ref/runtime/IntRefImpl;[Ljava/lang/Object;)Ljava/lang/Void;"
    );
    assert_eq!(
        shape(&generated.elements),
        strings(&[
            "Load(Reference, 1)",
            "IConst0",
            "invoke OperationInfra.checkCount",
            "IConst5",
            "Load(Reference, 0)",
            "invoke IntRefImpl.set",
            "AConstNull",
            "Return(Some(Reference))",
        ])
    );
}

#[test]
fn rewritten_code_keeps_labels_and_scopes_valid() {
    init_logging();
    let mut method = MethodBuilder::new("(I)V", true);
    let start = method.label();
    method.local(0, "x", "I", start, start.next());
    method
        .push(Instruction::Load(TypeKind::Int, 0))
        .push(Instruction::Pop);
    let end = method.label();
    assert_eq!(end, start.next());
    method.push(Instruction::Return(None));
    let code = method.build(1);

    // Covers the start label and the declaration, but not the end label
    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    code.select(id("test:scoped"))
        .from(Point::before(0))
        .to(Point::after(3))
        .unwrap()
        .extract(
            &mut operations,
            "scoped",
            StackDelta::method_like(vec![], None),
            call_and_pop,
        )
        .unwrap();

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    let mut expected = strings(&["Label(L0)", "Load(Int, 0)"]);
    expected.push(operation_descriptor("I"));
    expected.extend(call_and_pop_shape());
    assert_eq!(shape(&rewritten.elements)[..expected.len()], expected[..]);

    let reparsed = TransformableCode::new(
        code.method().clone(),
        rewritten.elements.clone(),
        rewritten.max_locals,
    )
    .unwrap();
    let locals = reparsed.locals().unwrap();
    assert_eq!(locals.entries().len(), 1);
    assert_eq!(locals.entries()[0].slot, 0);
    assert!(locals.find(0, Point::before(0)).unwrap().is_some());

    let generated = &rewritten.generated[0];
    assert!(generated
        .elements
        .contains(&Pseudo::Label(start).into()));
    assert!(!generated
        .elements
        .iter()
        .any(|element| matches!(element, CodeElement::Pseudo(Pseudo::LocalVariable(_)))));
}

#[test]
fn nested_extractions_finish_inside_out() {
    init_logging();
    let code = increment();
    let settings = Settings::new();
    let mut operations = Operations::new(&settings);

    let outer = code
        .select(id("test:outer"))
        .from(Point::before(1))
        .to(Point::after(4))
        .unwrap()
        .extract(
            &mut operations,
            "outer",
            StackDelta::method_like(vec![], None),
            call_and_pop,
        )
        .unwrap();
    let one = code.get(2).unwrap();
    let inner = code
        .select(id("test:inner"))
        .only(one)
        .extract(
            &mut operations,
            "inner",
            StackDelta::method_like(vec![], Some(FieldType::int())),
            call_and_pop,
        )
        .unwrap();

    let rewritten = apply_operations(&code, &operations, &settings).unwrap();
    assert_eq!(rewritten.generated.len(), 2);
    assert_eq!(rewritten.generated[0].name, inner);
    assert_eq!(rewritten.generated[1].name, outer);

    let bound_in = |elements: &[CodeElement]| -> Vec<UnqualifiedName> {
        elements.iter().filter_map(bound_method).collect()
    };
    assert_eq!(bound_in(&rewritten.elements), vec![outer]);
    assert_eq!(bound_in(&rewritten.generated[1].elements), vec![inner]);
    assert!(bound_in(&rewritten.generated[0].elements).is_empty());
}

#[test]
fn multi_push_cannot_be_extracted() {
    let code = increment();
    let settings = Settings::new();
    let mut operations = Operations::new(&settings);
    let result = code.select(id("test:dup")).only(code.get(1).unwrap()).extract(
        &mut operations,
        "dup",
        StackDelta::of(vec![], vec![FieldType::int(), FieldType::int()]),
        call_and_pop,
    );

    assert!(matches!(result, Err(Error::UnsupportedShape { .. })));
    assert!(operations.is_empty());
}
