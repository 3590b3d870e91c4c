use std::collections::HashMap;

use pretty_assertions::assert_eq;

use nova_syntax::{for_each_expr_in_member, Expr, ExprKind, FileId, Location, Workspace};

use crate::{ClassType, Program, Type, MISSING_IMPLEMENTATION, UNRESOLVED_NAME};

fn program(sources: &[(&str, &str)]) -> Program {
    Program::build(&Workspace::from_sources(sources.iter().copied()))
}

/// Location of the first expression in `file` (pre-order) matching `pred`.
fn find_expr(program: &Program, file: &str, pred: impl Fn(&Expr) -> bool) -> Location {
    let file = FileId::new(file);
    let unit = program.syntax_tree(&file).expect("file exists");
    let mut found = None;
    for decl in &unit.types {
        for member in &decl.members {
            for_each_expr_in_member(member, &mut |expr| {
                if found.is_none() && pred(expr) {
                    found = Some(expr.id);
                }
            });
        }
    }
    Location::new(file, found.expect("expression exists"))
}

fn is_call(name: &'static str) -> impl Fn(&Expr) -> bool {
    move |expr| matches!(&expr.kind, ExprKind::Call { name: n, .. } if n == name)
}

fn is_name(name: &'static str) -> impl Fn(&Expr) -> bool {
    move |expr| matches!(&expr.kind, ExprKind::Name(n) if n == name)
}

#[test]
fn classes_without_extends_derive_from_the_root() {
    let program = program(&[("A.java", "class A { }")]);
    let a = program.type_by_name("A").expect("A");
    let decl = program.type_symbol(a).expect("type");
    assert_eq!(
        decl.superclass,
        Some(Type::class(program.root_type(), Vec::new()))
    );
    assert!(program.is_subtype(a, program.root_type()));
    assert_eq!(program.symbol(program.root_type()).name(), "Object");
}

#[test]
fn generic_supertypes_are_substituted() {
    let program = program(&[(
        "Box.java",
        r#"
        class Box<T> {
            T value;
            T get() { return value; }
        }
        class Label { }
        class LabelBox extends Box<Label> {
            Label peek() { return get(); }
        }
        "#,
    )]);
    let label = program.type_by_name("Label").expect("Label");
    let boxed = program.type_by_name("Box").expect("Box");
    let label_box = program.type_by_name("LabelBox").expect("LabelBox");

    let ancestors = program.ancestors(&ClassType::raw(label_box));
    assert_eq!(
        ancestors,
        vec![
            ClassType::new(boxed, vec![Type::class(label, Vec::new())]),
            ClassType::raw(program.root_type()),
        ]
    );

    let call = find_expr(&program, "Box.java", is_call("get"));
    assert_eq!(
        program.expr_type(&call),
        Some(&Type::class(label, Vec::new()))
    );
    let resolved = program.resolved(&call).expect("get resolves");
    assert_eq!(resolved.implicit_this, Some(label_box));
    assert_eq!(program.symbol(resolved.symbol).owner(), Some(boxed));
}

#[test]
fn unqualified_members_resolve_through_enclosing_classes() {
    let program = program(&[(
        "Outer.java",
        r#"
        class Outer {
            int count;
            void bump() { }
            class Inner {
                void run() { bump(); count = count + 1; }
            }
        }
        "#,
    )]);
    let outer = program.type_by_name("Outer").expect("Outer");

    let call = find_expr(&program, "Outer.java", is_call("bump"));
    assert_eq!(program.resolved(&call).expect("bump").implicit_this, Some(outer));

    let name = find_expr(&program, "Outer.java", is_name("count"));
    let resolved = program.resolved(&name).expect("count");
    assert_eq!(program.symbol(resolved.symbol).name(), "count");
    assert_eq!(resolved.implicit_this, Some(outer));
    assert!(program.diagnostics().is_empty(), "{:?}", program.diagnostics());
}

#[test]
fn super_receivers_start_lookup_at_the_superclass() {
    let program = program(&[(
        "Zoo.java",
        r#"
        class Animal { String speak() { return "..."; } }
        class Dog extends Animal {
            String speak() { return super.speak() + "!"; }
        }
        "#,
    )]);
    let animal = program.type_by_name("Animal").expect("Animal");
    let call = find_expr(&program, "Zoo.java", |expr| {
        matches!(&expr.kind, ExprKind::Call { receiver: Some(r), .. } if matches!(r.kind, ExprKind::Super))
    });
    let resolved = program.resolved(&call).expect("super.speak resolves");
    assert_eq!(program.symbol(resolved.symbol).owner(), Some(animal));
    assert_eq!(
        program.expr_type(&call),
        Some(&Type::class(program.string_type(), Vec::new()))
    );
}

#[test]
fn override_and_subclass_queries() {
    let program = program(&[(
        "Zoo.java",
        r#"
        class Animal { void speak() { } public String toString() { return ""; } }
        class Dog extends Animal { void speak() { } }
        class Puppy extends Dog { void speak() { } }
        "#,
    )]);
    let animal = program.type_by_name("Animal").expect("Animal");
    let dog = program.type_by_name("Dog").expect("Dog");
    let puppy = program.type_by_name("Puppy").expect("Puppy");

    assert_eq!(program.transitive_subclasses(animal), vec![dog, puppy]);

    let puppy_speak = program.type_symbol(puppy).expect("type").methods[0];
    let overridden: Vec<Option<crate::SymbolId>> = program
        .overridden_methods(puppy_speak)
        .into_iter()
        .map(|method| program.symbol(method).owner())
        .collect();
    assert_eq!(overridden, vec![Some(dog), Some(animal)]);

    let to_string = program.type_symbol(animal).expect("type").methods[1];
    let overridden = program.overridden_methods(to_string);
    assert_eq!(overridden.len(), 1);
    assert!(program.is_builtin(overridden[0]));
}

#[test]
fn files_mentioning_a_type_include_expression_uses() {
    let program = program(&[
        ("Dog.java", "class Dog { static Dog create() { return new Dog(); } }"),
        ("Owner.java", "class Owner { void walk() { Dog.create(); } }"),
        ("Other.java", "class Other { }"),
    ]);
    let dog = program.type_by_name("Dog").expect("Dog");
    let files: Vec<String> = program
        .files_mentioning(dog)
        .into_iter()
        .map(|file| file.0)
        .collect();
    assert_eq!(files, vec!["Dog.java".to_string(), "Owner.java".to_string()]);
}

#[test]
fn reports_unresolved_and_semantic_errors() {
    let program = program(&[(
        "Bad.java",
        r#"
        abstract class Shape { abstract int area(); }
        class Square extends Shape { }
        class Base { Base(int x) { } }
        class Derived extends Base { }
        class User { void m() { missing(); unknown = 1; new Shape(); } }
        "#,
    )]);

    let mut found: Vec<(&str, String)> = program
        .diagnostics()
        .iter()
        .map(|diag| (diag.code, diag.message.clone()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            (
                "abstract-instantiation",
                "`Shape` is abstract; cannot be instantiated".to_string()
            ),
            (
                MISSING_IMPLEMENTATION,
                "class `Square` does not implement abstract method `area` of `Shape`".to_string()
            ),
            (
                "no-default-constructor",
                "`Base` has no no-argument constructor".to_string()
            ),
            (
                "unresolved-method",
                "cannot resolve method `missing` with 0 argument(s)".to_string()
            ),
            (UNRESOLVED_NAME, "cannot resolve symbol `unknown`".to_string()),
        ]
    );
}

#[test]
fn interface_methods_without_body_are_abstract_and_public() {
    let program = program(&[(
        "Named.java",
        "interface Named { String name(); default String greet() { return name(); } }",
    )]);
    let named = program.type_by_name("Named").expect("Named");
    let methods = &program.type_symbol(named).expect("type").methods;
    let name = program.method(methods[0]).expect("method");
    let greet = program.method(methods[1]).expect("method");
    assert!(name.is_abstract);
    assert!(!greet.is_abstract);
    assert_eq!(name.modifiers.visibility, nova_syntax::Visibility::Public);
}

#[test]
fn type_refs_render_substituted_types() {
    let program = program(&[("A.java", "class A<T> { java.util.List<T>[] items; }")]);
    let a = program.type_by_name("A").expect("A");
    let field = program.type_symbol(a).expect("type").fields[0];
    let ty = &program.field(field).expect("field").ty;
    let map: HashMap<String, Type> = [("T".to_string(), Type::class(program.string_type(), Vec::new()))]
        .into_iter()
        .collect();
    assert_eq!(
        program.type_ref(&ty.subst(&map)).to_string(),
        "java.util.List<String>[]"
    );
}
