use std::collections::HashMap;

use nova_delegate::{
    execute, scan, DelegationConfig, DelegationSurface, DelegationTarget, EditFailure,
    ExecuteReport, NamingChoices, UsageRecord,
};
use nova_hir::{Program, SymbolId};
use nova_syntax::{FileId, Span, Workspace};

/// `Dog extends Animal`, with `Puppy extends Dog` overriding `speak`.
pub const ZOO: &[(&str, &str)] = &[
    (
        "Animal.java",
        r#"
class Animal {
    protected String name;
    Animal(String name) { this.name = name; }
    String speak() { return "..."; }
    String getName() { return name; }
}
"#,
    ),
    (
        "Dog.java",
        r#"
class Dog extends Animal {
    Dog(String name) { super(name); }
    String describe() { return getName() + " says " + speak(); }
}
"#,
    ),
    (
        "Puppy.java",
        r#"
class Puppy extends Dog {
    Puppy() { super("pup"); }
    @Override
    String speak() { return super.speak() + "!"; }
}
"#,
    ),
];

/// A parsed workspace and the program resolved from it.
pub struct Fixture {
    pub workspace: Workspace,
    pub program: Program,
    sources: HashMap<FileId, String>,
}

impl Fixture {
    pub fn new(sources: &[(&str, &str)]) -> Self {
        let workspace = Workspace::from_sources(sources.iter().copied());
        let program = Program::build(&workspace);
        let sources = sources
            .iter()
            .map(|(path, text)| (FileId::new(*path), text.to_string()))
            .collect();
        Self {
            workspace,
            program,
            sources,
        }
    }

    /// `base` sources with `extra` files added (or replaced).
    pub fn with(base: &[(&str, &str)], extra: &[(&'static str, &'static str)]) -> Self {
        let mut sources: Vec<(&str, &str)> = base
            .iter()
            .filter(|(path, _)| !extra.iter().any(|(extra_path, _)| extra_path == path))
            .copied()
            .collect();
        sources.extend_from_slice(extra);
        Self::new(&sources)
    }

    pub fn ty(&self, name: &str) -> SymbolId {
        self.program
            .type_by_name(name)
            .unwrap_or_else(|| panic!("type `{name}` exists"))
    }

    pub fn method(&self, ty: &str, name: &str) -> SymbolId {
        let decl = self.program.type_symbol(self.ty(ty)).expect("type symbol");
        decl.methods
            .iter()
            .copied()
            .find(|method| self.program.symbol(*method).name() == name)
            .unwrap_or_else(|| panic!("method `{ty}.{name}` exists"))
    }

    pub fn target(&self, host: &str, base: &str) -> DelegationTarget {
        DelegationTarget::by_name(&self.program, host, base).expect("valid delegation target")
    }

    pub fn scan(&self, host: &str, base: &str) -> (DelegationTarget, Vec<UsageRecord>) {
        let target = self.target(host, base);
        let records = scan(&self.program, &target);
        (target, records)
    }

    /// Source text covered by `span` in `file`.
    pub fn text(&self, file: &FileId, span: Span) -> &str {
        &self.sources[file][span.start..span.end]
    }

    pub fn print(&self, file: &str) -> String {
        self.workspace
            .print_file(&FileId::new(file))
            .unwrap_or_else(|| panic!("file `{file}` exists"))
    }

    /// Scans and converts `host` in one go.
    pub fn execute(
        &mut self,
        host: &str,
        base: &str,
        surface: &DelegationSurface,
        naming: &NamingChoices,
    ) -> Result<ExecuteReport, EditFailure> {
        let (target, records) = self.scan(host, base);
        execute(
            &mut self.workspace,
            &self.program,
            &target,
            &records,
            surface,
            naming,
        )
    }
}

/// Names derived from the default `delegate.toml`.
pub fn naming(base: &str) -> NamingChoices {
    DelegationConfig::default()
        .naming_for(base)
        .expect("default naming is valid")
}

pub fn strict() -> DelegationSurface {
    DelegationConfig::default().surface()
}
