use pretty_assertions::assert_eq;

use nova_delegate::{scan, AccessibilityContext, Role, Usage, UsageKind};

use super::fixtures::{Fixture, ZOO};

#[test]
fn classifies_member_uses_and_lost_overrides_in_file_order() {
    let fx = Fixture::new(ZOO);
    let (_, records) = fx.scan("Dog", "Animal");

    let dog = fx.ty("Dog");
    let puppy = fx.ty("Puppy");
    let get_name = fx.method("Animal", "getName");
    let speak = fx.method("Animal", "speak");
    let puppy_speak = fx.method("Puppy", "speak");

    let summary: Vec<_> = records
        .iter()
        .map(|record| (record.kind(), record.member(), record.container, record.context))
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                UsageKind::UnqualifiedMemberUse,
                Some(get_name),
                dog,
                AccessibilityContext::HostClass
            ),
            (
                UsageKind::UnqualifiedMemberUse,
                Some(speak),
                dog,
                AccessibilityContext::HostClass
            ),
            (
                UsageKind::LostOverride,
                Some(puppy_speak),
                puppy,
                AccessibilityContext::Subclass(puppy)
            ),
            (
                UsageKind::QualifiedMemberUse,
                Some(speak),
                puppy,
                AccessibilityContext::Subclass(puppy)
            ),
        ]
    );

    let texts: Vec<&str> = records
        .iter()
        .map(|record| fx.text(&record.location.file, record.span))
        .collect();
    assert_eq!(texts, vec!["getName()", "speak()", "speak", "super.speak()"]);

    assert_eq!(
        records[2].usage,
        Usage::LostOverride {
            method: puppy_speak,
            overridden: speak,
        }
    );
}

#[test]
fn scanning_twice_yields_identical_records() {
    let fx = Fixture::new(ZOO);
    let target = fx.target("Dog", "Animal");
    let first = scan(&fx.program, &target);
    let second = scan(&fx.program, &target);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn root_upcasts_are_found_in_every_role() {
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
    let (_, records) = fx.scan("Dog", "Animal");
    let main = fx.ty("Main");

    let roles: Vec<Role> = records
        .iter()
        .filter(|record| record.container == main)
        .map(|record| match record.usage {
            Usage::RootUpcast { role } => role,
            ref other => panic!("unexpected usage in Main: {other:?}"),
        })
        .collect();
    assert_eq!(
        roles,
        vec![
            Role::Initializer,
            Role::Argument,
            Role::Assignment,
            Role::Cast,
            Role::Return,
        ]
    );
    assert!(records
        .iter()
        .filter(|record| record.container == main)
        .all(|record| record.context == AccessibilityContext::External));
}

#[test]
fn typed_upcasts_name_the_base_chain_type() {
    let fx = Fixture::with(
        ZOO,
        &[(
            "Main.java",
            r#"
class Main {
    static void run() {
        Dog d = new Dog("rex");
        Animal a = d;
        Dog same = d;
    }
}
"#,
        )],
    );
    let (_, records) = fx.scan("Dog", "Animal");
    let main = fx.ty("Main");
    let animal = fx.ty("Animal");

    let in_main: Vec<_> = records
        .iter()
        .filter(|record| record.container == main)
        .collect();
    assert_eq!(in_main.len(), 1);
    assert_eq!(
        in_main[0].usage,
        Usage::TypedUpcast {
            target: animal,
            role: Role::Initializer,
        }
    );
    assert_eq!(fx.text(&in_main[0].location.file, in_main[0].span), "d");
}

#[test]
fn qualified_uses_through_host_instances_are_found_outside_the_hierarchy() {
    let fx = Fixture::with(
        ZOO,
        &[(
            "Owner.java",
            r#"
class Owner {
    String call(Dog d, Animal a) { return d.getName() + a.getName(); }
}
"#,
        )],
    );
    let (_, records) = fx.scan("Dog", "Animal");
    let owner = fx.ty("Owner");

    let in_owner: Vec<_> = records
        .iter()
        .filter(|record| record.container == owner)
        .collect();
    // `a.getName()` goes through a plain base instance and is not a host usage.
    assert_eq!(in_owner.len(), 1);
    assert_eq!(in_owner[0].kind(), UsageKind::QualifiedMemberUse);
    assert_eq!(fx.text(&in_owner[0].location.file, in_owner[0].span), "d.getName()");
    assert_eq!(in_owner[0].context, AccessibilityContext::External);
}

#[test]
fn unrelated_files_are_not_scanned() {
    let fx = Fixture::with(
        ZOO,
        &[(
            "Cat.java",
            r#"
class Cat extends Animal {
    Cat() { super("cat"); }
    String purr() { return getName(); }
}
"#,
        )],
    );
    let (_, records) = fx.scan("Dog", "Animal");
    assert!(records
        .iter()
        .all(|record| record.location.file.as_str() != "Cat.java"));
}

#[test]
fn records_serialize_with_a_variant_tag() {
    let fx = Fixture::new(ZOO);
    let (_, records) = fx.scan("Dog", "Animal");
    let json = serde_json::to_value(&records[0]).expect("record serializes");
    assert_eq!(json["usage"]["variant"], "unqualified_member_use");
    assert_eq!(json["context"], "host_class");
}
