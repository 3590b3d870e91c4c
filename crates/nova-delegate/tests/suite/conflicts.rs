use pretty_assertions::assert_eq;

use nova_delegate::{analyze_conflicts, ConflictCategory, DelegationPolicy, DelegationSurface};

use super::fixtures::{strict, Fixture, ZOO};

#[test]
fn unforwarded_members_and_lost_overrides_are_reported() {
    let fx = Fixture::new(ZOO);
    let (target, records) = fx.scan("Dog", "Animal");
    let surface = strict().forward(fx.method("Animal", "speak"));

    let conflicts = analyze_conflicts(&fx.program, &target, &records, &surface);
    let summary: Vec<_> = conflicts
        .iter()
        .map(|conflict| (conflict.category, conflict.container, conflict.subject))
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                ConflictCategory::ExcludedMember,
                fx.ty("Dog"),
                Some(fx.method("Animal", "getName"))
            ),
            (
                ConflictCategory::LostOverride,
                fx.ty("Puppy"),
                Some(fx.method("Puppy", "speak"))
            ),
        ]
    );
    assert_eq!(
        conflicts[1].message,
        "`Puppy.speak` will no longer override `Animal.speak`"
    );
}

#[test]
fn member_conflicts_are_grouped_per_member_and_container() {
    let fx = Fixture::with(
        ZOO,
        &[
            (
                "Dog.java",
                r#"
class Dog extends Animal {
    Dog(String name) { super(name); }
    String a() { return getName(); }
    String b() { return getName() + getName(); }
}
"#,
            ),
            (
                "Main.java",
                r#"
class Main {
    String n(Dog d) { return d.getName(); }
}
"#,
            ),
        ],
    );
    let (target, records) = fx.scan("Dog", "Animal");
    let get_name = fx.method("Animal", "getName");

    let conflicts = analyze_conflicts(&fx.program, &target, &records, &strict());
    let excluded: Vec<_> = conflicts
        .iter()
        .filter(|conflict| conflict.category == ConflictCategory::ExcludedMember)
        .collect();
    assert_eq!(excluded.len(), 2);

    let in_dog = excluded
        .iter()
        .find(|conflict| conflict.container == fx.ty("Dog"))
        .expect("conflict for Dog");
    assert_eq!(in_dog.subject, Some(get_name));
    assert_eq!(in_dog.locations.len(), 3);

    let in_main = excluded
        .iter()
        .find(|conflict| conflict.container == fx.ty("Main"))
        .expect("conflict for Main");
    assert_eq!(in_main.locations.len(), 1);
}

#[test]
fn every_root_upcast_is_its_own_conflict() {
    let fx = Fixture::with(
        ZOO,
        &[(
            "Main.java",
            r#"
class Main {
    static Object id(Object o) { return o; }
    static Object run(Dog d) {
        Object a = d;
        id(d);
        Object b;
        b = d;
        Object c = (Object) d;
        return d;
    }
}
"#,
        )],
    );
    let (target, records) = fx.scan("Dog", "Animal");
    let surface = DelegationSurface::new(DelegationPolicy::AutoForward);

    let roots: Vec<_> = analyze_conflicts(&fx.program, &target, &records, &surface)
        .into_iter()
        .filter(|conflict| conflict.category == ConflictCategory::RootUpcast)
        .collect();
    assert_eq!(roots.len(), 5);
    assert!(roots.iter().all(|conflict| conflict.locations.len() == 1));
    assert!(roots
        .iter()
        .all(|conflict| conflict.message == "`Dog` instance used as `Object` will no longer be a `Animal`"));
}

#[test]
fn auto_forward_reports_only_unrepairable_usages() {
    let fx = Fixture::with(
        ZOO,
        &[(
            "Main.java",
            r#"
class Main {
    static void run(Dog d) {
        Animal a = d;
        Object o = d;
        d.getName();
    }
}
"#,
        )],
    );
    let (target, records) = fx.scan("Dog", "Animal");
    let surface = DelegationSurface::new(DelegationPolicy::AutoForward);

    let categories: Vec<ConflictCategory> =
        analyze_conflicts(&fx.program, &target, &records, &surface)
            .into_iter()
            .map(|conflict| conflict.category)
            .collect();
    assert_eq!(
        categories,
        vec![ConflictCategory::RootUpcast, ConflictCategory::LostOverride]
    );
}

#[test]
fn typed_upcasts_to_kept_interfaces_are_not_conflicts() {
    let fx = Fixture::new(&[
        (
            "Named.java",
            "interface Named { String name(); }",
        ),
        (
            "Person.java",
            r#"
class Person implements Named {
    public String name() { return "p"; }
    String greet() { return "hi"; }
}
"#,
        ),
        (
            "Clerk.java",
            r#"
class Clerk extends Person {
    static Named asNamed(Clerk c) { return c; }
    static Person asPerson(Clerk c) { return c; }
}
"#,
        ),
    ]);
    let (target, records) = fx.scan("Clerk", "Person");
    let named = fx.ty("Named");

    let dropped = analyze_conflicts(&fx.program, &target, &records, &strict());
    let subjects: Vec<_> = dropped
        .iter()
        .filter(|conflict| conflict.category == ConflictCategory::TypedUpcast)
        .map(|conflict| conflict.subject)
        .collect();
    assert_eq!(subjects, vec![Some(fx.ty("Named")), Some(fx.ty("Person"))]);

    let kept = strict().keep_interface(named);
    let subjects: Vec<_> = analyze_conflicts(&fx.program, &target, &records, &kept)
        .into_iter()
        .filter(|conflict| conflict.category == ConflictCategory::TypedUpcast)
        .map(|conflict| conflict.subject)
        .collect();
    assert_eq!(subjects, vec![Some(fx.ty("Person"))]);
}
