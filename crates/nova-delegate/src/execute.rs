//! The conversion itself.
//!
//! A [`Plan`] is computed from the immutable program snapshot. Its phases then
//! run against a [`StagedWorkspace`]; the staged program is re-resolved and
//! compared with the snapshot, and only a clean result is committed to the
//! live workspace.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use nova_hir::{Diagnostic, Program, Symbol, SymbolId, Type};
use nova_syntax::{
    for_each_expr, for_each_expr_in_block, for_each_expr_in_member, make, rewrite_member,
    CtorCallKind, Expr, ExprKind, FieldDecl, FileId, IdGen, Location, Member, MethodDecl,
    Modifiers, NodeId, StmtKind, TypeDecl, TypeParam, TypeRef, Visibility, Workspace,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::{upper_camel, ConfigError, DelegationPolicy, DelegationSurface, NamingChoices};
use crate::conflicts::is_forwarded;
use crate::db::DelegationDatabase;
use crate::edit::{EditOp, InsertAt, StagedWorkspace, SyntaxTreeEditing};
use crate::members::{host_decl, DelegationTarget};
use crate::usage::{AccessibilityContext, Usage, UsageRecord};

/// Why a conversion was abandoned. The workspace is unchanged in every case.
#[derive(Debug, Error)]
pub enum EditFailure {
    #[error("conversion cancelled")]
    Cancelled,
    #[error("invalid delegation surface: {0}")]
    InvalidSurface(String),
    #[error("stale location in `{file}` ({node:?})")]
    StaleLocation { file: FileId, node: Option<NodeId> },
    #[error("the delegate is not reachable from `{container}`; an accessor is required")]
    DelegateNotAccessible { container: String },
    #[error("`{wrapper}` cannot implement abstract method `{method}`: `{host}` does not override it")]
    UnimplementableMember {
        wrapper: String,
        method: String,
        host: String,
    },
    #[error("conversion would introduce {} new error(s)", .diagnostics.len())]
    ValidationFailed { diagnostics: Vec<Diagnostic> },
    #[error("{phase} rejected: {reason}")]
    Rejected { phase: Phase, reason: String },
    #[error(transparent)]
    InvalidNaming(#[from] ConfigError),
    #[error("`{name}` is already declared in `{host}`")]
    NameTaken { name: String, host: String },
    #[error("initializer of `{host}.{field}` would read the delegate before a constructor assigns it")]
    DelegateReadBeforeInit { host: String, field: String },
}

/// Staged phases, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    RewriteSites,
    SynthesizeWrapper,
    AddDelegate,
    AddForwarders,
    UpdateHierarchy,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::RewriteSites,
        Phase::SynthesizeWrapper,
        Phase::AddDelegate,
        Phase::AddForwarders,
        Phase::UpdateHierarchy,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Phase::RewriteSites => "usage-site rewriting",
            Phase::SynthesizeWrapper => "wrapper synthesis",
            Phase::AddDelegate => "delegate field",
            Phase::AddForwarders => "forwarding methods",
            Phase::UpdateHierarchy => "hierarchy clause",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook run against the staged workspace after each phase.
pub type PhaseCheck<'a> = &'a dyn Fn(Phase, &Workspace) -> Result<(), String>;

#[derive(Clone, Copy, Default)]
pub struct ExecuteOptions<'a> {
    /// Checked once, before the first phase.
    pub cancel: Option<&'a AtomicBool>,
    pub phase_check: Option<PhaseCheck<'a>>,
}

impl ExecuteOptions<'_> {
    fn check(&self, phase: Phase, staged: &StagedWorkspace) -> Result<(), EditFailure> {
        tracing::debug!(target: "nova.delegate", %phase, edits = staged.log().len(), "phase staged");
        match self.phase_check {
            Some(check) => check(phase, staged.workspace())
                .map_err(|reason| EditFailure::Rejected { phase, reason }),
            None => Ok(()),
        }
    }
}

/// What a committed conversion did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecuteReport {
    pub host: String,
    pub base: String,
    pub field: String,
    pub accessor: Option<String>,
    pub wrapper: Option<String>,
    /// Host overrides moved into the wrapper.
    pub moved_overrides: Vec<String>,
    pub rewritten_sites: usize,
    pub forwarders: Vec<String>,
    pub files: Vec<FileId>,
    pub edits: Vec<EditOp>,
}

/// Converts `target.host` from extending `target.base` to delegating to it.
///
/// `records` must come from [`crate::scan`] over the same snapshot `db`
/// describes, and `workspace` must be the workspace `db` was built from.
pub fn execute(
    workspace: &mut Workspace,
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    records: &[UsageRecord],
    surface: &DelegationSurface,
    naming: &NamingChoices,
) -> Result<ExecuteReport, EditFailure> {
    execute_with(
        workspace,
        db,
        target,
        records,
        surface,
        naming,
        ExecuteOptions::default(),
    )
}

pub fn execute_with(
    workspace: &mut Workspace,
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    records: &[UsageRecord],
    surface: &DelegationSurface,
    naming: &NamingChoices,
    options: ExecuteOptions<'_>,
) -> Result<ExecuteReport, EditFailure> {
    let result = run(workspace, db, target, records, surface, naming, options);
    if let Err(err) = &result {
        tracing::warn!(
            target: "nova.delegate",
            host = db.name(target.host),
            base = db.name(target.base),
            error = %err,
            "delegation aborted; workspace left unchanged"
        );
    }
    result
}

fn run(
    workspace: &mut Workspace,
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    records: &[UsageRecord],
    surface: &DelegationSurface,
    naming: &NamingChoices,
    options: ExecuteOptions<'_>,
) -> Result<ExecuteReport, EditFailure> {
    let plan = Plan::new(db, target, records, surface, naming)?;
    if options
        .cancel
        .is_some_and(|flag| flag.load(Ordering::SeqCst))
    {
        return Err(EditFailure::Cancelled);
    }

    let mut staged = StagedWorkspace::new(workspace);
    let rewritten_sites = plan.rewrite_sites(&mut staged)?;
    options.check(Phase::RewriteSites, &staged)?;
    plan.synthesize_wrapper(&mut staged)?;
    options.check(Phase::SynthesizeWrapper, &staged)?;
    plan.add_delegate(&mut staged)?;
    options.check(Phase::AddDelegate, &staged)?;
    plan.add_forwarders(&mut staged)?;
    options.check(Phase::AddForwarders, &staged)?;
    plan.update_hierarchy(&mut staged)?;
    options.check(Phase::UpdateHierarchy, &staged)?;

    validate(db, staged.workspace())?;

    let files: Vec<FileId> = staged.touched().cloned().collect();
    let edits = staged.commit(workspace);
    tracing::debug!(
        target: "nova.delegate",
        host = %plan.host_name,
        files = files.len(),
        edits = edits.len(),
        "delegation committed"
    );
    Ok(ExecuteReport {
        host: plan.host_name.clone(),
        base: db.name(target.base).to_string(),
        field: naming.field.clone(),
        accessor: plan.accessor.clone(),
        wrapper: plan.wrapper.clone(),
        moved_overrides: plan.moved.iter().map(|method| method.name.clone()).collect(),
        rewritten_sites,
        forwarders: plan.forwarders.iter().map(|fwd| fwd.name.clone()).collect(),
        files,
        edits,
    })
}

/// Fails if `staged` resolves with diagnostics the snapshot did not have.
fn validate(db: &dyn DelegationDatabase, staged: &Workspace) -> Result<(), EditFailure> {
    fn key(diagnostic: &Diagnostic) -> (FileId, &'static str, String) {
        (
            diagnostic.file.clone(),
            diagnostic.code,
            diagnostic.message.clone(),
        )
    }

    let program = Program::build(staged);
    let mut before: HashMap<(FileId, &'static str, String), usize> = HashMap::new();
    for diagnostic in db.diagnostics() {
        *before.entry(key(diagnostic)).or_default() += 1;
    }
    let introduced: Vec<Diagnostic> = program
        .diagnostics()
        .iter()
        .filter(|diagnostic| match before.get_mut(&key(diagnostic)) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect();
    if introduced.is_empty() {
        Ok(())
    } else {
        Err(EditFailure::ValidationFailed {
            diagnostics: introduced,
        })
    }
}

/// How a site reaches the delegate.
#[derive(Clone, Debug)]
enum Route {
    /// Through the private field; only from inside the host.
    Field,
    /// Through the public accessor.
    Accessor(String),
}

#[derive(Clone, Debug)]
enum SiteRewrite {
    /// Qualify a static member with its declaring type.
    Static(String),
    /// Send a member use to the delegate instead of the host instance.
    Member(Route),
    /// Replace a host instance with its delegate.
    Upcast(Route),
}

/// A forwarding method to generate on the host.
#[derive(Clone, Debug)]
struct Forwarder {
    name: String,
    type_params: Vec<TypeParam>,
    return_ty: TypeRef,
    params: Vec<(TypeRef, String)>,
    visibility: Visibility,
}

/// Self-references inside a moved override that must point back at the host.
#[derive(Default)]
struct OuterRefs {
    members: HashSet<NodeId>,
    this_values: HashSet<NodeId>,
}

struct Plan<'a> {
    db: &'a dyn DelegationDatabase,
    target: &'a DelegationTarget,
    naming: &'a NamingChoices,
    file: FileId,
    host_node: NodeId,
    host_name: String,
    base_is_class: bool,
    accessor: Option<String>,
    wrapper: Option<String>,
    moved: Vec<MethodDecl>,
    outer_refs: OuterRefs,
    /// Distinct `super(...)` signatures of the host constructors, with the
    /// base constructor's parameter names.
    super_signatures: Vec<(Vec<Type>, Vec<String>)>,
    init_in_constructors: bool,
    /// Some host field initializer goes through the delegate.
    read_by_field_init: bool,
    sites: BTreeMap<FileId, HashMap<NodeId, SiteRewrite>>,
    forwarders: Vec<Forwarder>,
    interfaces_to_add: Vec<TypeRef>,
    stale_overrides: HashSet<NodeId>,
}

fn receiver_of(expr: &Expr) -> Option<&Expr> {
    match &expr.kind {
        ExprKind::FieldAccess { receiver, .. } => Some(receiver),
        ExprKind::Call { receiver, .. } => receiver.as_deref(),
        _ => None,
    }
}

impl<'a> Plan<'a> {
    fn new(
        db: &'a dyn DelegationDatabase,
        target: &'a DelegationTarget,
        records: &[UsageRecord],
        surface: &'a DelegationSurface,
        naming: &'a NamingChoices,
    ) -> Result<Self, EditFailure> {
        naming.validate()?;
        validate_surface(db, target, surface)?;

        let host_name = db.name(target.host).to_string();
        let (unit, decl) = host_decl(db, target.host).ok_or_else(|| {
            let location = db.symbol(target.host).location();
            EditFailure::StaleLocation {
                file: location.file.clone(),
                node: Some(location.node),
            }
        })?;
        let file = unit.file.clone();
        let loc = |node: NodeId| Location::new(file.clone(), node);

        let accessor = naming.accessor.clone().or_else(|| {
            (surface.policy == DelegationPolicy::AutoForward)
                .then(|| format!("get{}", upper_camel(&naming.field)))
        });
        let taken = |name: &str, is_type: bool| {
            decl.members.iter().any(|member| match member {
                Member::Field(field) => !is_type && field.name == name,
                Member::Method(method) => !is_type && method.name == name && method.params.is_empty(),
                Member::Type(nested) => is_type && nested.name == name,
                Member::Constructor(_) => false,
            })
        };
        for name in std::iter::once(&naming.field).chain(accessor.as_ref()) {
            if taken(name, false) {
                return Err(EditFailure::NameTaken {
                    name: name.clone(),
                    host: host_name,
                });
            }
        }

        // Host methods overriding an instance method of the base chain.
        let overrides: Vec<&MethodDecl> = decl
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Method(method) => Some(method),
                _ => None,
            })
            .filter(|method| {
                db.declaration_at(&loc(method.id)).is_some_and(|symbol| {
                    db.overridden_methods(symbol).into_iter().any(|overridden| {
                        target.surface.declares(overridden) && !db.symbol(overridden).is_static()
                    })
                })
            })
            .collect();

        let base_is_class = db
            .type_symbol(target.base)
            .is_some_and(|base| !base.is_interface());
        let needs_wrapper = target.base_is_abstract(db)
            || overrides
                .iter()
                .any(|method| references_host_state(db, &file, target.host, method));

        let mut moved = Vec::new();
        let mut outer_refs = OuterRefs::default();
        let mut wrapper = None;
        if needs_wrapper {
            if taken(&naming.wrapper, true) {
                return Err(EditFailure::NameTaken {
                    name: naming.wrapper.clone(),
                    host: host_name,
                });
            }
            for member in target.surface.methods().filter(|member| member.is_abstract) {
                let implemented = overrides.iter().any(|method| {
                    method.name == member.name && method.params.len() == member.arity
                });
                if !implemented {
                    return Err(EditFailure::UnimplementableMember {
                        wrapper: naming.wrapper.clone(),
                        method: member.name.clone(),
                        host: host_name,
                    });
                }
            }
            for method in &overrides {
                collect_outer_refs(db, surface, target, &file, method, &mut outer_refs);
            }
            moved = overrides.into_iter().cloned().collect();
            wrapper = Some(naming.wrapper.clone());
        }

        let mut super_signatures: Vec<(Vec<Type>, Vec<String>)> = Vec::new();
        if base_is_class {
            let ctors = decl.members.iter().filter_map(|member| match member {
                Member::Constructor(ctor) => Some(ctor),
                _ => None,
            });
            let mut any_ctor = false;
            for ctor in ctors {
                any_ctor = true;
                let signature = match ctor.explicit_call() {
                    Some((_, CtorCallKind::This, _)) => continue,
                    Some((stmt, CtorCallKind::Super, args)) if !args.is_empty() => {
                        let Some(resolved) = db.resolved(&loc(stmt.id)) else {
                            continue;
                        };
                        let names = db
                            .symbol(resolved.symbol)
                            .as_constructor()
                            .map(|ctor| ctor.param_names.clone())
                            .unwrap_or_default();
                        (resolved.signature.clone(), names)
                    }
                    _ => (Vec::new(), Vec::new()),
                };
                if !super_signatures.iter().any(|(seen, _)| *seen == signature.0) {
                    super_signatures.push(signature);
                }
            }
            if !any_ctor {
                super_signatures.push((Vec::new(), Vec::new()));
            }
        }
        let init_in_constructors = super_signatures.iter().any(|(sig, _)| !sig.is_empty());

        let moved_exprs: HashSet<NodeId> = moved
            .iter()
            .filter_map(|method| method.body.as_ref())
            .flat_map(|body| {
                let mut ids = Vec::new();
                for_each_expr_in_block(body, &mut |expr| ids.push(expr.id));
                ids
            })
            .collect();
        let host_supers: HashSet<NodeId> = decl
            .members
            .iter()
            .filter(|member| !matches!(member, Member::Type(_)))
            .flat_map(|member| {
                let mut ids = Vec::new();
                for_each_expr_in_member(member, &mut |expr| {
                    if matches!(expr.kind, ExprKind::Super) {
                        ids.push(expr.id);
                    }
                });
                ids
            })
            .collect();

        let retained = target.retained_supertypes(db, &surface.interfaces);
        let retained_without_kept = target.retained_supertypes(db, &[]);

        let mut plan = Plan {
            db,
            target,
            naming,
            file: file.clone(),
            host_node: decl.id,
            host_name,
            base_is_class,
            accessor,
            wrapper,
            moved,
            outer_refs,
            super_signatures,
            init_in_constructors,
            read_by_field_init: false,
            sites: BTreeMap::new(),
            forwarders: Vec::new(),
            interfaces_to_add: Vec::new(),
            stale_overrides: HashSet::new(),
        };

        for record in records {
            let in_moved_body =
                record.location.file == file && moved_exprs.contains(&record.location.node);
            if in_moved_body {
                continue;
            }
            let rewrite = match &record.usage {
                Usage::RootUpcast { .. } | Usage::LostOverride { .. } => continue,
                Usage::TypedUpcast { target: ty, .. } => {
                    if retained.contains(ty) {
                        continue;
                    }
                    SiteRewrite::Upcast(plan.route(record)?)
                }
                Usage::UnqualifiedMemberUse { member } | Usage::QualifiedMemberUse { member, .. } => {
                    let symbol = db.symbol(*member);
                    if symbol.is_static() {
                        match symbol.owner() {
                            Some(owner) => SiteRewrite::Static(db.name(owner).to_string()),
                            None => continue,
                        }
                    } else if !target.surface.declares(*member) {
                        // Host overrides stay reachable on the host.
                        continue;
                    } else {
                        let super_in_host = match &record.usage {
                            Usage::QualifiedMemberUse { receiver, .. } => {
                                record.container == target.host
                                    && receiver.file == file
                                    && host_supers.contains(&receiver.node)
                            }
                            _ => false,
                        };
                        if is_forwarded(db, surface, *member) && !super_in_host {
                            continue;
                        }
                        SiteRewrite::Member(plan.route(record)?)
                    }
                }
            };
            plan.sites
                .entry(record.location.file.clone())
                .or_default()
                .insert(record.location.node, rewrite);
        }

        let reads_delegate = |field: &FieldDecl| {
            let (Some(sites), Some(init)) = (plan.sites.get(&file), &field.init) else {
                return false;
            };
            let mut found = false;
            for_each_expr(init, &mut |expr| {
                found |= sites
                    .get(&expr.id)
                    .is_some_and(|rewrite| !matches!(rewrite, SiteRewrite::Static(_)));
            });
            found
        };
        let reading_field = decl.members.iter().find_map(|member| match member {
            Member::Field(field) if reads_delegate(field) => Some(field.name.clone()),
            _ => None,
        });
        if let Some(field) = reading_field {
            if plan.init_in_constructors {
                return Err(EditFailure::DelegateReadBeforeInit {
                    host: plan.host_name,
                    field,
                });
            }
            plan.read_by_field_init = true;
        }

        plan.forwarders = plan_forwarders(db, target, surface, decl, &plan.moved, &file);
        plan.interfaces_to_add = surface
            .interfaces
            .iter()
            .filter(|iface| !retained_without_kept.contains(iface))
            .filter_map(|iface| target.surface.interface(*iface))
            .map(|iface| db.type_ref(&Type::Class(iface.clone())))
            .collect();
        plan.stale_overrides = decl
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Method(method) if has_override_annotation(&method.modifiers) => {
                    Some(method)
                }
                _ => None,
            })
            .filter(|method| !plan.moved.iter().any(|moved| moved.id == method.id))
            .filter(|method| {
                let Some(symbol) = db.declaration_at(&loc(method.id)) else {
                    return false;
                };
                db.overridden_methods(symbol).into_iter().all(|overridden| {
                    db.symbol(overridden)
                        .owner()
                        .is_some_and(|owner| !retained.contains(&owner))
                })
            })
            .map(|method| method.id)
            .collect();

        tracing::debug!(
            target: "nova.delegate",
            host = %plan.host_name,
            sites = plan.sites.values().map(HashMap::len).sum::<usize>(),
            wrapper = plan.wrapper.is_some(),
            moved = plan.moved.len(),
            forwarders = plan.forwarders.len(),
            "planned delegation"
        );
        Ok(plan)
    }

    fn route(&self, record: &UsageRecord) -> Result<Route, EditFailure> {
        if record.context == AccessibilityContext::HostClass {
            return Ok(Route::Field);
        }
        self.accessor
            .clone()
            .map(Route::Accessor)
            .ok_or_else(|| EditFailure::DelegateNotAccessible {
                container: self.db.name(record.container).to_string(),
            })
    }

    fn delegate_instance(&self, ids: &mut IdGen) -> Expr {
        let ty = match &self.wrapper {
            Some(wrapper) => TypeRef::named(wrapper.as_str()),
            None => self.target.base_ref.clone(),
        };
        make::new_object(ids, ty, Vec::new())
    }

    /// Phase 1.
    fn rewrite_sites(&self, staged: &mut StagedWorkspace) -> Result<usize, EditFailure> {
        let field = self.naming.field.as_str();
        let mut total = 0;
        for (file, rewrites) in &self.sites {
            let mut seen = HashSet::new();
            total += staged.rewrite_exprs(file, &mut |expr, ids| {
                let Some(rewrite) = rewrites.get(&expr.id) else {
                    return Ok(false);
                };
                seen.insert(expr.id);
                apply_site(expr, rewrite, field, ids);
                Ok(true)
            })?;
            if let Some(missing) = rewrites.keys().find(|node| !seen.contains(*node)) {
                return Err(EditFailure::StaleLocation {
                    file: file.clone(),
                    node: Some(*missing),
                });
            }
        }
        Ok(total)
    }

    /// Phase 2.
    fn synthesize_wrapper(&self, staged: &mut StagedWorkspace) -> Result<(), EditFailure> {
        let Some(wrapper) = &self.wrapper else {
            return Ok(());
        };
        let mut methods = Vec::new();
        for method in &self.moved {
            if let Member::Method(method) =
                staged.remove_member(&self.file, self.host_node, method.id)?
            {
                methods.push(method);
            }
        }

        let ids = staged.ids(&self.file)?;
        let (extends, implements) = if self.base_is_class {
            (vec![self.target.base_ref.clone()], Vec::new())
        } else {
            (Vec::new(), vec![self.target.base_ref.clone()])
        };
        let mut decl = make::class(
            ids,
            Modifiers::with_visibility(Visibility::Private),
            wrapper,
            extends,
            implements,
        );

        if self.init_in_constructors {
            for (signature, names) in &self.super_signatures {
                let params: Vec<(TypeRef, String)> = signature
                    .iter()
                    .enumerate()
                    .map(|(idx, ty)| {
                        let name = names.get(idx).cloned().unwrap_or_else(|| format!("arg{idx}"));
                        (self.db.type_ref(ty), name)
                    })
                    .collect();
                let args: Vec<Expr> = params.iter().map(|(_, name)| make::name(ids, name)).collect();
                let call = make::ctor_call(ids, CtorCallKind::Super, args);
                let body = make::block(ids, vec![call]);
                let params = params
                    .into_iter()
                    .map(|(ty, name)| make::param(ids, ty, &name))
                    .collect();
                let ctor = make::constructor(ids, Modifiers::default(), wrapper, params, body);
                decl.members.push(Member::Constructor(ctor));
            }
        }

        let host = self.host_name.as_str();
        for method in methods {
            let mut member = Member::Method(method);
            rewrite_member(&mut member, &mut |expr| {
                if self.outer_refs.members.contains(&expr.id) {
                    replace_receiver(expr, |_| make::qualified_this(ids, host));
                } else if self.outer_refs.this_values.contains(&expr.id) {
                    expr.kind = ExprKind::This {
                        qualifier: Some(host.to_string()),
                    };
                }
            });
            decl.members.push(member);
        }

        staged.insert_member(&self.file, self.host_node, InsertAt::End, Member::Type(decl))?;
        Ok(())
    }

    /// Phase 3.
    fn add_delegate(&self, staged: &mut StagedWorkspace) -> Result<(), EditFailure> {
        let field_name = self.naming.field.as_str();
        let ids = staged.ids(&self.file)?;
        let init = (!self.init_in_constructors).then(|| self.delegate_instance(ids));
        let modifiers = Modifiers {
            visibility: Visibility::Private,
            is_final: true,
            ..Modifiers::default()
        };
        let field = make::field(ids, modifiers, self.target.base_ref.clone(), field_name, init);
        // Field initializers run in declaration order.
        let at = if self.read_by_field_init {
            InsertAt::BeforeFields
        } else {
            InsertAt::AfterFields
        };
        staged.insert_member(&self.file, self.host_node, at, Member::Field(field))?;

        if self.init_in_constructors {
            let instance_ty = match &self.wrapper {
                Some(wrapper) => TypeRef::named(wrapper.as_str()),
                None => self.target.base_ref.clone(),
            };
            staged.edit_type(&self.file, self.host_node, &mut |decl, ids| {
                for member in &mut decl.members {
                    let Member::Constructor(ctor) = member else {
                        continue;
                    };
                    let explicit = ctor.body.stmts.first_mut().and_then(|stmt| match &mut stmt.kind {
                        StmtKind::ConstructorCall { kind, args } => Some((*kind, args)),
                        _ => None,
                    });
                    match explicit {
                        Some((CtorCallKind::This, _)) => {}
                        Some((CtorCallKind::Super, args)) if !args.is_empty() => {
                            let args = std::mem::take(args);
                            let value = make::new_object(ids, instance_ty.clone(), args);
                            let target = make::name(ids, field_name);
                            let assign = make::assign(ids, target, value);
                            ctor.body.stmts[0] = make::expr_stmt(ids, assign);
                        }
                        Some((CtorCallKind::Super, _)) => {
                            ctor.body.stmts[0] = init_stmt(ids, field_name, instance_ty.clone());
                        }
                        None => {
                            let stmt = init_stmt(ids, field_name, instance_ty.clone());
                            ctor.body.stmts.insert(0, stmt);
                        }
                    }
                }
                Ok(())
            })?;
        }

        if let Some(accessor) = &self.accessor {
            let ids = staged.ids(&self.file)?;
            let value = make::name(ids, field_name);
            let ret = make::ret(ids, Some(value));
            let body = make::block(ids, vec![ret]);
            let method = make::method(
                ids,
                Modifiers::with_visibility(Visibility::Public),
                Vec::new(),
                self.target.base_ref.clone(),
                accessor,
                Vec::new(),
                Some(body),
            );
            staged.insert_member(&self.file, self.host_node, InsertAt::BeforeTypes, Member::Method(method))?;
        }
        Ok(())
    }

    /// Phase 4.
    fn add_forwarders(&self, staged: &mut StagedWorkspace) -> Result<(), EditFailure> {
        for forwarder in &self.forwarders {
            let ids = staged.ids(&self.file)?;
            let args = forwarder
                .params
                .iter()
                .map(|(_, name)| make::name(ids, name))
                .collect();
            let receiver = make::name(ids, &self.naming.field);
            let call = make::call(ids, Some(receiver), &forwarder.name, args);
            let stmt = if forwarder.return_ty.is_void() {
                make::expr_stmt(ids, call)
            } else {
                make::ret(ids, Some(call))
            };
            let body = make::block(ids, vec![stmt]);
            let params = forwarder
                .params
                .iter()
                .map(|(ty, name)| make::param(ids, ty.clone(), name))
                .collect();
            let method = make::method(
                ids,
                Modifiers::with_visibility(forwarder.visibility),
                forwarder.type_params.clone(),
                forwarder.return_ty.clone(),
                &forwarder.name,
                params,
                Some(body),
            );
            staged.insert_member(&self.file, self.host_node, InsertAt::BeforeTypes, Member::Method(method))?;
        }
        Ok(())
    }

    /// Phase 5.
    fn update_hierarchy(&self, staged: &mut StagedWorkspace) -> Result<(), EditFailure> {
        let base_ref = &self.target.base_ref;
        staged.edit_type(&self.file, self.host_node, &mut |decl: &mut TypeDecl, _| {
            decl.extends.retain(|ty| ty != base_ref);
            decl.implements.retain(|ty| ty != base_ref);
            decl.implements.extend(self.interfaces_to_add.iter().cloned());
            for member in &mut decl.members {
                if let Member::Method(method) = member {
                    if self.stale_overrides.contains(&method.id) {
                        method
                            .modifiers
                            .annotations
                            .retain(|annotation| !is_override(annotation));
                    }
                }
            }
            Ok(())
        })
    }
}

fn validate_surface(
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    surface: &DelegationSurface,
) -> Result<(), EditFailure> {
    let base = db.name(target.base);
    for forwarded in &surface.methods {
        let name = db.name(forwarded.member);
        let Some(member) = target.surface.member(forwarded.member) else {
            return Err(EditFailure::InvalidSurface(format!(
                "`{name}` is not a member of `{base}`"
            )));
        };
        if !member.is_method() || member.is_static {
            return Err(EditFailure::InvalidSurface(format!(
                "`{name}` is not an instance method of `{base}`"
            )));
        }
    }
    for iface in &surface.interfaces {
        if target.surface.interface(*iface).is_none() {
            return Err(EditFailure::InvalidSurface(format!(
                "`{}` is not an interface implemented by `{base}`",
                db.name(*iface)
            )));
        }
    }
    Ok(())
}

fn is_override(annotation: &str) -> bool {
    annotation.rsplit('.').next() == Some("Override")
}

fn has_override_annotation(modifiers: &Modifiers) -> bool {
    modifiers.annotations.iter().any(|annotation| is_override(annotation))
}

/// Whether an override body touches the host: host-declared members, or
/// `this` used as a value.
fn references_host_state(
    db: &dyn DelegationDatabase,
    file: &FileId,
    host: SymbolId,
    method: &MethodDecl,
) -> bool {
    let Some(body) = &method.body else {
        return false;
    };
    let mut receivers = HashSet::new();
    let mut this_exprs = Vec::new();
    let mut uses_host = false;
    for_each_expr_in_block(body, &mut |expr| {
        if matches!(expr.kind, ExprKind::This { .. }) {
            this_exprs.push(expr.id);
        }
        if let Some(receiver) = receiver_of(expr) {
            receivers.insert(receiver.id);
        }
        if let Some(resolved) = db.resolved(&Location::new(file.clone(), expr.id)) {
            let symbol = db.symbol(resolved.symbol);
            if !matches!(symbol, Symbol::Constructor(_)) && symbol.owner() == Some(host) {
                uses_host = true;
            }
        }
    });
    uses_host || this_exprs.iter().any(|id| !receivers.contains(id))
}

fn collect_outer_refs(
    db: &dyn DelegationDatabase,
    surface: &DelegationSurface,
    target: &DelegationTarget,
    file: &FileId,
    method: &MethodDecl,
    out: &mut OuterRefs,
) {
    let Some(body) = &method.body else {
        return;
    };
    let mut receivers = HashSet::new();
    let mut this_exprs = Vec::new();
    for_each_expr_in_block(body, &mut |expr| {
        if expr.is_bare_this() {
            this_exprs.push(expr.id);
        }
        let receiver = receiver_of(expr);
        if let Some(receiver) = receiver {
            receivers.insert(receiver.id);
        }
        let Some(resolved) = db.resolved(&Location::new(file.clone(), expr.id)) else {
            return;
        };
        let through_this = match receiver {
            None => resolved.implicit_this == Some(target.host),
            Some(receiver) => receiver.is_bare_this(),
        };
        let symbol = db.symbol(resolved.symbol);
        let host_member = symbol.owner() == Some(target.host);
        let forwarded = target.surface.declares(resolved.symbol)
            && is_forwarded(db, surface, resolved.symbol);
        if through_this
            && !symbol.is_static()
            && !matches!(symbol, Symbol::Constructor(_))
            && (host_member || forwarded)
        {
            out.members.insert(expr.id);
        }
    });
    out.this_values
        .extend(this_exprs.into_iter().filter(|id| !receivers.contains(id)));
}

fn plan_forwarders(
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    surface: &DelegationSurface,
    host: &TypeDecl,
    moved: &[MethodDecl],
    file: &FileId,
) -> Vec<Forwarder> {
    let mut declared: HashSet<(String, usize)> = host
        .members
        .iter()
        .filter_map(|member| match member {
            Member::Method(method) if !moved.iter().any(|m| m.id == method.id) => {
                Some((method.name.clone(), method.params.len()))
            }
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    for forwarded in &surface.methods {
        let (Some(member), Some(data)) = (
            target.surface.member(forwarded.member),
            db.method(forwarded.member),
        ) else {
            continue;
        };
        if !declared.insert((data.name.clone(), data.arity())) {
            continue;
        }
        let params = data
            .params
            .iter()
            .zip(&data.param_names)
            .map(|(ty, name)| (db.type_ref(&ty.subst(&member.subst)), name.clone()))
            .collect();
        out.push(Forwarder {
            name: data.name.clone(),
            type_params: data.type_params.clone(),
            return_ty: db.type_ref(&data.return_ty.subst(&member.subst)),
            params,
            visibility: forwarded
                .visibility
                .map_or(member.visibility, |requested| requested.min(member.visibility)),
        });
    }
    for method in moved {
        if !declared.insert((method.name.clone(), method.params.len())) {
            continue;
        }
        tracing::trace!(target: "nova.delegate", %file, method = %method.name, "forwarding moved override");
        out.push(Forwarder {
            name: method.name.clone(),
            type_params: method.type_params.clone(),
            return_ty: method.return_ty.clone(),
            params: method
                .params
                .iter()
                .map(|param| (param.ty.clone(), param.name.clone()))
                .collect(),
            visibility: method.modifiers.visibility,
        });
    }
    out
}

fn init_stmt(ids: &mut IdGen, field: &str, ty: TypeRef) -> nova_syntax::Stmt {
    let value = make::new_object(ids, ty, Vec::new());
    let target = make::name(ids, field);
    let assign = make::assign(ids, target, value);
    make::expr_stmt(ids, assign)
}

/// Swaps the receiver of a member reference, turning a bare name into a
/// field access.
fn replace_receiver(expr: &mut Expr, build: impl FnOnce(Option<Expr>) -> Expr) {
    let kind = std::mem::replace(&mut expr.kind, ExprKind::Missing);
    expr.kind = match kind {
        ExprKind::Name(name) => ExprKind::FieldAccess {
            receiver: Box::new(build(None)),
            name,
        },
        ExprKind::FieldAccess { receiver, name } => ExprKind::FieldAccess {
            receiver: Box::new(build(Some(*receiver))),
            name,
        },
        ExprKind::Call {
            receiver,
            name,
            args,
        } => ExprKind::Call {
            receiver: Some(Box::new(build(receiver.map(|receiver| *receiver)))),
            name,
            args,
        },
        other => other,
    };
}

/// The delegate of `instance` (the enclosing host instance when `None`).
fn delegate_of(ids: &mut IdGen, route: &Route, field: &str, instance: Option<Expr>) -> Expr {
    let instance = instance.filter(|expr| !matches!(expr.kind, ExprKind::Super) && !expr.is_bare_this());
    match route {
        Route::Field => match instance {
            Some(instance) => make::field_access(ids, instance, field),
            None => make::name(ids, field),
        },
        Route::Accessor(accessor) => make::call(ids, instance, accessor, Vec::new()),
    }
}

fn apply_site(expr: &mut Expr, rewrite: &SiteRewrite, field: &str, ids: &mut IdGen) {
    match rewrite {
        SiteRewrite::Static(owner) => replace_receiver(expr, |_| make::name(ids, owner)),
        SiteRewrite::Member(route) => {
            replace_receiver(expr, |receiver| delegate_of(ids, route, field, receiver));
        }
        SiteRewrite::Upcast(route) => {
            let instance = Expr {
                id: expr.id,
                kind: std::mem::replace(&mut expr.kind, ExprKind::Missing),
                range: expr.range,
            };
            *expr = delegate_of(ids, route, field, Some(instance));
        }
    }
}
