use std::cell::RefCell;
use std::sync::atomic::AtomicBool;

use pretty_assertions::assert_eq;

use nova_delegate::{
    execute_with, DelegationConfig, DelegationPolicy, EditFailure, EditOp, ExecuteOptions, Phase,
};
use nova_syntax::{FileId, Visibility, Workspace};

use super::fixtures::{naming, strict, Fixture, ZOO};

#[test]
fn host_delegates_and_forwards_the_chosen_methods() {
    let mut fx = Fixture::new(ZOO);
    let surface = strict().forward(fx.method("Animal", "speak"));

    let report = fx
        .execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Dog.java"),
        r#"class Dog {
    private final Animal animal;

    Dog(String name) {
        animal = new Animal(name);
    }

    String describe() {
        return animal.getName() + " says " + speak();
    }

    String speak() {
        return animal.speak();
    }
}
"#
    );
    assert_eq!(report.host, "Dog");
    assert_eq!(report.base, "Animal");
    assert_eq!(report.field, "animal");
    assert_eq!(report.accessor, None);
    assert_eq!(report.wrapper, None);
    assert_eq!(report.rewritten_sites, 1);
    assert_eq!(report.forwarders, vec!["speak".to_string()]);
    assert_eq!(report.files, vec![FileId::new("Dog.java")]);
}

#[test]
fn files_without_repairable_usages_are_left_alone() {
    let mut fx = Fixture::with(
        ZOO,
        &[(
            "Main.java",
            r#"
class Main {
    static void run() {
        Dog d = new Dog("rex");
        Object o = d;
    }
}
"#,
        )],
    );
    let before = fx.print("Main.java");
    let surface = strict().forward(fx.method("Animal", "speak"));

    let report = fx
        .execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect("conversion succeeds");

    assert_eq!(fx.print("Main.java"), before);
    assert!(!report.files.contains(&FileId::new("Main.java")));
    assert!(fx.print("Puppy.java").contains("return super.speak() + \"!\";"));
}

#[test]
fn typed_upcasts_outside_the_host_need_an_accessor() {
    const MAIN: (&str, &str) = (
        "Main.java",
        r#"
class Main {
    static void run() {
        Dog d = new Dog("rex");
        Animal a = d;
    }
}
"#,
    );
    let mut fx = Fixture::with(ZOO, &[MAIN]);
    let surface = strict().forward(fx.method("Animal", "speak"));
    let before = fx.workspace.clone();

    let err = fx
        .execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect_err("no route to the delegate from Main");
    assert!(
        matches!(&err, EditFailure::DelegateNotAccessible { container } if container == "Main"),
        "{err:?}"
    );
    assert_eq!(fx.workspace, before);

    let naming = naming("Animal").with_accessor("getAnimal");
    let report = fx
        .execute("Dog", "Animal", &surface, &naming)
        .expect("conversion succeeds with an accessor");
    assert_eq!(report.accessor.as_deref(), Some("getAnimal"));
    assert!(fx.print("Main.java").contains("        Animal a = d.getAnimal();\n"));
    assert!(fx
        .print("Dog.java")
        .contains("    public Animal getAnimal() {\n        return animal;\n    }\n"));
}

#[test]
fn abstract_bases_get_a_private_wrapper_with_the_moved_overrides() {
    let mut fx = Fixture::new(&[
        (
            "Shape.java",
            "abstract class Shape { abstract double area(); }",
        ),
        (
            "Square.java",
            r#"
class Square extends Shape {
    private double side;
    Square(double side) { this.side = side; }
    @Override
    double area() { return side * side; }
}
"#,
        ),
    ]);

    let report = fx
        .execute("Square", "Shape", &strict(), &naming("Shape"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Square.java"),
        r#"class Square {
    private double side;
    private final Shape shape = new MyShape();

    Square(double side) {
        this.side = side;
    }

    double area() {
        return shape.area();
    }

    private class MyShape extends Shape {
        @Override
        double area() {
            return Square.this.side * Square.this.side;
        }
    }
}
"#
    );
    assert_eq!(report.wrapper.as_deref(), Some("MyShape"));
    assert_eq!(report.moved_overrides, vec!["area".to_string()]);
}

#[test]
fn overrides_touching_host_state_move_into_the_wrapper() {
    let mut fx = Fixture::new(&[
        (
            "Counter.java",
            "class Counter { int count() { return 0; } int twice() { return count() * 2; } }",
        ),
        (
            "Clicks.java",
            r#"
class Clicks extends Counter {
    int clicks;
    @Override
    int count() { return clicks; }
}
"#,
        ),
    ]);
    let surface = strict().forward(fx.method("Counter", "twice"));

    fx.execute("Clicks", "Counter", &surface, &naming("Counter"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Clicks.java"),
        r#"class Clicks {
    int clicks;
    private final Counter counter = new MyCounter();

    int twice() {
        return counter.twice();
    }

    int count() {
        return counter.count();
    }

    private class MyCounter extends Counter {
        @Override
        int count() {
            return Clicks.this.clicks;
        }
    }
}
"#
    );
}

#[test]
fn interface_bases_are_implemented_by_the_wrapper() {
    let mut fx = Fixture::new(&[
        ("Greeter.java", "interface Greeter { String greet(); }"),
        (
            "Polite.java",
            r#"
class Polite implements Greeter {
    String name = "sir";
    public String greet() { return "good day, " + name; }
}
"#,
        ),
    ]);

    fx.execute("Polite", "Greeter", &strict(), &naming("Greeter"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Polite.java"),
        r#"class Polite {
    String name = "sir";
    private final Greeter greeter = new MyGreeter();

    public String greet() {
        return greeter.greet();
    }

    private class MyGreeter implements Greeter {
        public String greet() {
            return "good day, " + Polite.this.name;
        }
    }
}
"#
    );
}

#[test]
fn abstract_members_the_host_does_not_implement_abort_the_conversion() {
    let mut fx = Fixture::new(&[
        (
            "Shape.java",
            "abstract class Shape { abstract double area(); }",
        ),
        (
            "Sketch.java",
            "abstract class Sketch extends Shape { String title() { return \"sketch\"; } }",
        ),
    ]);
    let before = fx.workspace.clone();

    let err = fx
        .execute("Sketch", "Shape", &strict(), &naming("Shape"))
        .expect_err("area cannot be implemented by the wrapper");
    assert!(
        matches!(
            &err,
            EditFailure::UnimplementableMember { wrapper, method, host }
                if wrapper == "MyShape" && method == "area" && host == "Sketch"
        ),
        "{err:?}"
    );
    assert_eq!(fx.workspace, before);
}

#[test]
fn edits_that_break_resolution_are_rolled_back() {
    let mut fx = Fixture::with(
        ZOO,
        &[(
            "Dog.java",
            r#"
class Dog extends Animal {
    Dog(String name) { super(name); }
    String label() { String animal = "x"; return animal + getName(); }
}
"#,
        )],
    );
    let surface = strict().forward(fx.method("Animal", "speak"));
    let before = fx.workspace.clone();

    let err = fx
        .execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect_err("the local `animal` shadows the delegate field");
    match &err {
        EditFailure::ValidationFailed { diagnostics } => {
            assert!(!diagnostics.is_empty());
            assert!(diagnostics
                .iter()
                .all(|diagnostic| diagnostic.file.as_str() == "Dog.java"));
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert_eq!(fx.workspace, before);
}

#[test]
fn static_members_are_qualified_with_their_declaring_type() {
    let mut fx = Fixture::with(
        ZOO,
        &[
            (
                "Animal.java",
                r#"
class Animal {
    Animal(String name) { }
    static Animal create() { return new Animal("x"); }
    String speak() { return "..."; }
}
"#,
            ),
            (
                "Dog.java",
                r#"
class Dog extends Animal {
    Dog(String name) { super(name); }
    void reset() { create(); }
}
"#,
            ),
        ],
    );
    let surface = strict().forward(fx.method("Animal", "speak"));

    fx.execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect("conversion succeeds");
    assert!(fx
        .print("Dog.java")
        .contains("    void reset() {\n        Animal.create();\n    }\n"));
}

#[test]
fn forwarders_substitute_generic_arguments() {
    let mut fx = Fixture::new(&[
        (
            "Box.java",
            "class Box<T> { T value; T get() { return value; } void put(T v) { value = v; } }",
        ),
        (
            "Labels.java",
            "class Labels extends Box<String> { int size() { return 0; } }",
        ),
    ]);
    let surface = strict()
        .forward(fx.method("Box", "get"))
        .forward(fx.method("Box", "put"));

    fx.execute("Labels", "Box", &surface, &naming("Box"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Labels.java"),
        r#"class Labels {
    private final Box<String> box = new Box<String>();

    int size() {
        return 0;
    }

    String get() {
        return box.get();
    }

    void put(String v) {
        box.put(v);
    }
}
"#
    );
}

#[test]
fn forwarders_pass_every_argument_in_order() {
    let mut fx = Fixture::new(&[
        (
            "Text.java",
            "class Text { String join(String a, String b, int times) { return a + b; } }",
        ),
        ("Note.java", "class Note extends Text { }"),
    ]);
    let surface = strict().forward(fx.method("Text", "join"));

    fx.execute("Note", "Text", &surface, &naming("Text"))
        .expect("conversion succeeds");
    assert!(fx.print("Note.java").contains(
        "    String join(String a, String b, int times) {\n        return text.join(a, b, times);\n    }\n"
    ));
}

#[test]
fn forwarder_visibility_never_widens_the_original() {
    let mut fx = Fixture::new(&[
        (
            "Base.java",
            r#"
class Base {
    public String id() { return "b"; }
    protected int size() { return 0; }
    void touch() { }
}
"#,
        ),
        ("Host.java", "class Host extends Base { }"),
    ]);
    let surface = strict()
        .forward_with_visibility(fx.method("Base", "id"), Visibility::Protected)
        .forward_with_visibility(fx.method("Base", "size"), Visibility::Public)
        .forward(fx.method("Base", "touch"));

    fx.execute("Host", "Base", &surface, &naming("Base"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Host.java"),
        r#"class Host {
    private final Base base = new Base();

    protected String id() {
        return base.id();
    }

    protected int size() {
        return base.size();
    }

    void touch() {
        base.touch();
    }
}
"#
    );
}

#[test]
fn auto_forward_routes_subclass_uses_through_the_accessor() {
    let mut fx = Fixture::with(
        ZOO,
        &[(
            "Puppy.java",
            r#"
class Puppy extends Dog {
    Puppy() { super("pup"); }
    String shout() { return getName() + "!"; }
}
"#,
        )],
    );
    let config = DelegationConfig {
        policy: DelegationPolicy::AutoForward,
        ..DelegationConfig::default()
    };
    let naming = config.naming_for("Animal").expect("valid naming");

    let report = fx
        .execute("Dog", "Animal", &config.surface(), &naming)
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Dog.java"),
        r#"class Dog {
    private final Animal animal;

    Dog(String name) {
        animal = new Animal(name);
    }

    String describe() {
        return animal.getName() + " says " + animal.speak();
    }

    public Animal getAnimal() {
        return animal;
    }
}
"#
    );
    assert!(fx
        .print("Puppy.java")
        .contains("        return getAnimal().getName() + \"!\";\n"));
    assert_eq!(report.rewritten_sites, 3);
    assert_eq!(
        report.files,
        vec![FileId::new("Dog.java"), FileId::new("Puppy.java")]
    );
}

#[test]
fn super_calls_in_host_overrides_go_to_the_delegate() {
    let mut fx = Fixture::with(
        ZOO,
        &[(
            "Dog.java",
            r#"
class Dog extends Animal {
    Dog(String name) { super(name); }
    @Override
    String speak() { return super.speak() + "!"; }
}
"#,
        )],
    );
    let surface = strict().forward(fx.method("Animal", "getName"));

    fx.execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect("conversion succeeds");
    let dog = fx.print("Dog.java");
    assert!(
        dog.contains("    String speak() {\n        return animal.speak() + \"!\";\n    }\n"),
        "{dog}"
    );
    assert!(!dog.contains("@Override"), "{dog}");
}

#[test]
fn generated_names_must_be_free_on_the_host() {
    let mut fx = Fixture::with(
        ZOO,
        &[(
            "Dog.java",
            r#"
class Dog extends Animal {
    String animal;
    Dog(String name) { super(name); }
}
"#,
        )],
    );
    let err = fx
        .execute("Dog", "Animal", &strict(), &naming("Animal"))
        .expect_err("`animal` is already a field of Dog");
    assert!(
        matches!(&err, EditFailure::NameTaken { name, host } if name == "animal" && host == "Dog"),
        "{err:?}"
    );
}

#[test]
fn only_base_methods_can_be_forwarded() {
    let mut fx = Fixture::new(ZOO);
    let surface = strict().forward(fx.method("Dog", "describe"));
    let err = fx
        .execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect_err("describe is declared by the host");
    assert!(matches!(err, EditFailure::InvalidSurface(_)), "{err:?}");
}

#[test]
fn invalid_names_are_rejected_before_editing() {
    let mut fx = Fixture::new(ZOO);
    let surface = strict().forward(fx.method("Animal", "speak"));
    let err = fx
        .execute("Dog", "Animal", &surface, &naming("Animal").with_accessor("get-animal"))
        .expect_err("accessor is not an identifier");
    assert!(matches!(err, EditFailure::InvalidNaming(_)), "{err:?}");
}

#[test]
fn a_rejected_phase_leaves_the_workspace_untouched() {
    for rejected in Phase::ALL {
        let mut fx = Fixture::new(ZOO);
        let surface = strict().forward(fx.method("Animal", "speak"));
        let (target, records) = fx.scan("Dog", "Animal");
        let before = fx.workspace.clone();

        let check = move |phase: Phase, _: &Workspace| -> Result<(), String> {
            if phase == rejected {
                Err(format!("{phase} rejected"))
            } else {
                Ok(())
            }
        };
        let options = ExecuteOptions {
            cancel: None,
            phase_check: Some(&check),
        };
        let err = execute_with(
            &mut fx.workspace,
            &fx.program,
            &target,
            &records,
            &surface,
            &naming("Animal"),
            options,
        )
        .expect_err("phase is rejected");
        assert!(
            matches!(&err, EditFailure::Rejected { phase, .. } if *phase == rejected),
            "{err:?}"
        );
        assert_eq!(fx.workspace, before, "workspace changed after rejecting {rejected}");
    }
}

#[test]
fn phases_run_in_order_against_the_staged_workspace() {
    let mut fx = Fixture::new(ZOO);
    let surface = strict().forward(fx.method("Animal", "speak"));
    let (target, records) = fx.scan("Dog", "Animal");

    let seen = RefCell::new(Vec::new());
    let check = |phase: Phase, staged: &Workspace| -> Result<(), String> {
        let dog = staged
            .print_file(&FileId::new("Dog.java"))
            .unwrap_or_default();
        seen.borrow_mut()
            .push((phase, dog.contains("extends Animal"), dog.contains("animal.speak()")));
        Ok(())
    };
    let options = ExecuteOptions {
        cancel: None,
        phase_check: Some(&check),
    };
    execute_with(
        &mut fx.workspace,
        &fx.program,
        &target,
        &records,
        &surface,
        &naming("Animal"),
        options,
    )
    .expect("conversion succeeds");

    assert_eq!(
        seen.into_inner(),
        vec![
            (Phase::RewriteSites, true, false),
            (Phase::SynthesizeWrapper, true, false),
            (Phase::AddDelegate, true, false),
            (Phase::AddForwarders, true, true),
            (Phase::UpdateHierarchy, false, true),
        ]
    );
}

#[test]
fn cancelled_conversions_do_not_edit() {
    let mut fx = Fixture::new(ZOO);
    let surface = strict().forward(fx.method("Animal", "speak"));
    let (target, records) = fx.scan("Dog", "Animal");
    let before = fx.workspace.clone();
    let cancel = AtomicBool::new(true);

    let err = execute_with(
        &mut fx.workspace,
        &fx.program,
        &target,
        &records,
        &surface,
        &naming("Animal"),
        ExecuteOptions {
            cancel: Some(&cancel),
            phase_check: None,
        },
    )
    .expect_err("cancelled");
    assert!(matches!(err, EditFailure::Cancelled), "{err:?}");
    assert_eq!(fx.workspace, before);
}

#[test]
fn the_patch_log_records_every_structural_edit() {
    let mut fx = Fixture::new(ZOO);
    let surface = strict().forward(fx.method("Animal", "speak"));

    let report = fx
        .execute("Dog", "Animal", &surface, &naming("Animal"))
        .expect("conversion succeeds");

    let inserts = report
        .edits
        .iter()
        .filter(|op| matches!(op, EditOp::Insert { .. }))
        .count();
    // Delegate field and the `speak` forwarder.
    assert_eq!(inserts, 2);
    assert!(report
        .edits
        .iter()
        .all(|op| matches!(op, EditOp::Insert { file, .. } | EditOp::Replace { file, .. } | EditOp::Delete { file, .. } if file.as_str() == "Dog.java")));

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["edits"][0]["op"], "replace");
}

#[test]
fn the_delegate_is_declared_before_field_initializers_that_read_it() {
    let mut fx = Fixture::new(&[
        ("Shelf.java", "class Shelf { int size() { return 3; } }"),
        (
            "Rack.java",
            r#"
class Rack extends Shelf {
    int slots = size();
    int spare;
}
"#,
        ),
    ]);

    let report = fx
        .execute("Rack", "Shelf", &strict(), &naming("Shelf"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Rack.java"),
        r#"class Rack {
    private final Shelf shelf = new Shelf();
    int slots = shelf.size();
    int spare;
}
"#
    );
    assert_eq!(report.rewritten_sites, 1);
}

#[test]
fn field_initializers_cannot_read_a_constructor_initialized_delegate() {
    let mut fx = Fixture::with(
        ZOO,
        &[
            (
                "Helper.java",
                r#"
class Helper {
    Helper(Animal animal) { }
}
"#,
            ),
            (
                "Dog.java",
                r#"
class Dog extends Animal {
    String tag = getName();
    Helper helper = new Helper(this);
    Dog(String name) { super(name); }
}
"#,
            ),
        ],
    );
    let before = fx.workspace.clone();

    let err = fx
        .execute("Dog", "Animal", &strict(), &naming("Animal"))
        .expect_err("the delegate is assigned after field initializers run");
    assert!(
        matches!(
            &err,
            EditFailure::DelegateReadBeforeInit { host, field } if host == "Dog" && field == "tag"
        ),
        "{err:?}"
    );
    assert_eq!(fx.workspace, before);
}

#[test]
fn delegate_initialization_follows_each_constructor_shape() {
    let mut fx = Fixture::new(&[
        (
            "Engine.java",
            r#"
class Engine {
    Engine() { }
    Engine(String name) { }
    String start() { return "on"; }
}
"#,
        ),
        (
            "Car.java",
            r#"
class Car extends Engine {
    int size;
    Car() { this("car"); }
    Car(String name) { super(name); }
    Car(int wheels, int doors) { super(); size = wheels; }
    Car(int a, int b, int c) { size = a; }
}
"#,
        ),
    ]);

    fx.execute("Car", "Engine", &strict(), &naming("Engine"))
        .expect("conversion succeeds");

    assert_eq!(
        fx.print("Car.java"),
        r#"class Car {
    int size;
    private final Engine engine;

    Car() {
        this("car");
    }

    Car(String name) {
        engine = new Engine(name);
    }

    Car(int wheels, int doors) {
        engine = new Engine();
        size = wheels;
    }

    Car(int a, int b, int c) {
        engine = new Engine();
        size = a;
    }
}
"#
    );
}
