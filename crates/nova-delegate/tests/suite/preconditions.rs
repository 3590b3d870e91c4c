use pretty_assertions::assert_eq;

use nova_delegate::{eligible_base_types, DelegationTarget, MemberKind, PreconditionViolation};

use super::fixtures::{Fixture, ZOO};

fn violation(fx: &Fixture, host: &str, base: &str) -> PreconditionViolation {
    DelegationTarget::by_name(&fx.program, host, base).expect_err("precondition violated")
}

#[test]
fn target_carries_the_member_surface_and_subclasses() {
    let fx = Fixture::new(ZOO);
    let target = fx.target("Dog", "Animal");

    assert_eq!(target.host, fx.ty("Dog"));
    assert_eq!(target.base, fx.ty("Animal"));
    assert_eq!(target.base_ref.to_string(), "Animal");
    assert_eq!(target.subclasses, vec![fx.ty("Puppy")]);

    let members: Vec<(&str, MemberKind)> = target
        .surface
        .members
        .iter()
        .map(|member| (member.name.as_str(), member.kind))
        .collect();
    assert_eq!(
        members,
        vec![
            ("name", MemberKind::Field),
            ("speak", MemberKind::Method),
            ("getName", MemberKind::Method),
        ]
    );
    assert!(!target.base_is_abstract(&fx.program));
}

#[test]
fn overridden_members_are_listed_once_with_the_most_derived_declaration() {
    let fx = Fixture::new(&[
        ("Base.java", "class Base { String id() { return \"base\"; } }"),
        ("Mid.java", "class Mid extends Base { String id() { return \"mid\"; } }"),
        ("Leaf.java", "class Leaf extends Mid { }"),
    ]);
    let target = fx.target("Leaf", "Mid");

    let ids: Vec<_> = target
        .surface
        .members
        .iter()
        .filter(|member| member.name == "id")
        .map(|member| member.symbol)
        .collect();
    assert_eq!(ids, vec![fx.method("Mid", "id")]);
    assert!(target.surface.declares(fx.method("Base", "id")));
    assert!(target.surface.chain_contains(fx.ty("Base")));
}

#[test]
fn unknown_types_are_reported_by_name() {
    let fx = Fixture::new(ZOO);
    assert_eq!(
        violation(&fx, "Dog", "Missing"),
        PreconditionViolation::UnknownType("Missing".to_string())
    );
}

#[test]
fn interfaces_cannot_be_hosts() {
    let fx = Fixture::new(&[
        ("Mover.java", "interface Mover { void move(); }"),
        ("Walker.java", "interface Walker extends Mover { }"),
    ]);
    assert_eq!(
        violation(&fx, "Walker", "Mover"),
        PreconditionViolation::HostNotAClass("Walker".to_string())
    );
}

#[test]
fn only_direct_supertypes_can_be_replaced() {
    let fx = Fixture::new(ZOO);
    assert_eq!(
        violation(&fx, "Puppy", "Animal"),
        PreconditionViolation::NotDirectSupertype {
            host: "Puppy".to_string(),
            base: "Animal".to_string(),
        }
    );
}

#[test]
fn classes_extending_only_the_root_have_nothing_to_delegate() {
    let fx = Fixture::new(&[("Lonely.java", "class Lonely { }")]);
    assert_eq!(
        violation(&fx, "Lonely", "Object"),
        PreconditionViolation::NoEligibleBase("Lonely".to_string())
    );
}

#[test]
fn bases_without_members_are_rejected() {
    let fx = Fixture::new(&[
        ("Empty.java", "class Empty { }"),
        ("Named.java", "interface Named { String name(); }"),
        (
            "Host.java",
            "class Host extends Empty implements Named { public String name() { return \"\"; } }",
        ),
    ]);
    assert_eq!(eligible_base_types(&fx.program, fx.ty("Host")), vec![fx.ty("Named")]);
    assert_eq!(
        violation(&fx, "Host", "Empty"),
        PreconditionViolation::NoMembers("Empty".to_string())
    );
}

#[test]
fn eligible_bases_are_the_direct_program_supertypes() {
    let fx = Fixture::new(ZOO);
    assert_eq!(eligible_base_types(&fx.program, fx.ty("Dog")), vec![fx.ty("Animal")]);
    assert_eq!(eligible_base_types(&fx.program, fx.ty("Animal")), Vec::new());
}
