//! Structural edits against a staged copy of the workspace.
//!
//! Every phase of a conversion goes through [`SyntaxTreeEditing`]; the live
//! workspace is only touched by [`StagedWorkspace::commit`], after the whole
//! transaction has been validated.

use std::collections::BTreeSet;

use nova_syntax::{
    rewrite_type, CompilationUnit, Expr, FileId, IdGen, Member, NodeId, TypeDecl, Workspace,
};
use serde::Serialize;

use crate::execute::EditFailure;

/// Where a new member goes inside its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertAt {
    /// Before the first field, or first when there are no fields.
    BeforeFields,
    /// After the last field, or first when there are no fields.
    AfterFields,
    /// Before the first nested type, or last when there are none.
    BeforeTypes,
    End,
}

/// One entry of the patch log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    Insert {
        file: FileId,
        owner: NodeId,
        node: NodeId,
    },
    Replace {
        file: FileId,
        node: NodeId,
    },
    Delete {
        file: FileId,
        node: NodeId,
    },
}

/// Insert/replace/delete operations on syntax trees.
pub trait SyntaxTreeEditing {
    /// Id allocator of `file`, for building new nodes.
    fn ids(&mut self, file: &FileId) -> Result<&mut IdGen, EditFailure>;

    /// Adds `member` to the type declared at `owner`; returns the member's id.
    fn insert_member(
        &mut self,
        file: &FileId,
        owner: NodeId,
        at: InsertAt,
        member: Member,
    ) -> Result<NodeId, EditFailure>;

    fn remove_member(
        &mut self,
        file: &FileId,
        owner: NodeId,
        member: NodeId,
    ) -> Result<Member, EditFailure>;

    /// Edits the type declared at `ty` in place.
    fn edit_type(
        &mut self,
        file: &FileId,
        ty: NodeId,
        edit: &mut dyn FnMut(&mut TypeDecl, &mut IdGen) -> Result<(), EditFailure>,
    ) -> Result<(), EditFailure>;

    /// Runs `edit` bottom-up over every expression of `file`. The callback
    /// returns whether it replaced the expression. Returns the number of
    /// replacements.
    fn rewrite_exprs(
        &mut self,
        file: &FileId,
        edit: &mut dyn FnMut(&mut Expr, &mut IdGen) -> Result<bool, EditFailure>,
    ) -> Result<usize, EditFailure>;
}

/// A clone of the workspace plus the log of operations applied to it.
#[derive(Debug, Clone)]
pub struct StagedWorkspace {
    staged: Workspace,
    log: Vec<EditOp>,
    touched: BTreeSet<FileId>,
}

impl StagedWorkspace {
    pub fn new(live: &Workspace) -> Self {
        Self {
            staged: live.clone(),
            log: Vec::new(),
            touched: BTreeSet::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.staged
    }

    pub fn log(&self) -> &[EditOp] {
        &self.log
    }

    pub fn touched(&self) -> impl Iterator<Item = &FileId> {
        self.touched.iter()
    }

    /// Replaces the touched files of `live` with their staged versions and
    /// returns the patch log.
    pub fn commit(self, live: &mut Workspace) -> Vec<EditOp> {
        for file in &self.touched {
            if let Some(unit) = self.staged.file(file) {
                live.insert(unit.clone());
            }
        }
        self.log
    }

    fn unit(&mut self, file: &FileId) -> Result<&mut CompilationUnit, EditFailure> {
        self.staged
            .file_mut(file)
            .ok_or_else(|| EditFailure::StaleLocation {
                file: file.clone(),
                node: None,
            })
    }

    fn record(&mut self, op: EditOp) {
        let file = match &op {
            EditOp::Insert { file, .. } | EditOp::Replace { file, .. } | EditOp::Delete { file, .. } => {
                file.clone()
            }
        };
        tracing::trace!(target: "nova.delegate", ?op, "staged edit");
        self.touched.insert(file);
        self.log.push(op);
    }
}

fn stale(file: &FileId, node: NodeId) -> EditFailure {
    EditFailure::StaleLocation {
        file: file.clone(),
        node: Some(node),
    }
}

fn insertion_index(members: &[Member], at: InsertAt) -> usize {
    match at {
        InsertAt::BeforeFields => members
            .iter()
            .position(|member| matches!(member, Member::Field(_)))
            .unwrap_or(0),
        InsertAt::AfterFields => members
            .iter()
            .rposition(|member| matches!(member, Member::Field(_)))
            .map_or(0, |idx| idx + 1),
        InsertAt::BeforeTypes => members
            .iter()
            .position(|member| matches!(member, Member::Type(_)))
            .unwrap_or(members.len()),
        InsertAt::End => members.len(),
    }
}

impl SyntaxTreeEditing for StagedWorkspace {
    fn ids(&mut self, file: &FileId) -> Result<&mut IdGen, EditFailure> {
        Ok(&mut self.unit(file)?.ids)
    }

    fn insert_member(
        &mut self,
        file: &FileId,
        owner: NodeId,
        at: InsertAt,
        member: Member,
    ) -> Result<NodeId, EditFailure> {
        let node = member.id();
        let decl = self
            .unit(file)?
            .type_decl_mut(owner)
            .ok_or_else(|| stale(file, owner))?;
        let idx = insertion_index(&decl.members, at);
        decl.members.insert(idx, member);
        self.record(EditOp::Insert {
            file: file.clone(),
            owner,
            node,
        });
        Ok(node)
    }

    fn remove_member(
        &mut self,
        file: &FileId,
        owner: NodeId,
        member: NodeId,
    ) -> Result<Member, EditFailure> {
        let decl = self
            .unit(file)?
            .type_decl_mut(owner)
            .ok_or_else(|| stale(file, owner))?;
        let idx = decl
            .members
            .iter()
            .position(|candidate| candidate.id() == member)
            .ok_or_else(|| stale(file, member))?;
        let removed = decl.members.remove(idx);
        self.record(EditOp::Delete {
            file: file.clone(),
            node: member,
        });
        Ok(removed)
    }

    fn edit_type(
        &mut self,
        file: &FileId,
        ty: NodeId,
        edit: &mut dyn FnMut(&mut TypeDecl, &mut IdGen) -> Result<(), EditFailure>,
    ) -> Result<(), EditFailure> {
        let CompilationUnit { types, ids, .. } = self.unit(file)?;
        let decl = find_type_mut(types, ty).ok_or_else(|| stale(file, ty))?;
        edit(decl, ids)?;
        self.record(EditOp::Replace {
            file: file.clone(),
            node: ty,
        });
        Ok(())
    }

    fn rewrite_exprs(
        &mut self,
        file: &FileId,
        edit: &mut dyn FnMut(&mut Expr, &mut IdGen) -> Result<bool, EditFailure>,
    ) -> Result<usize, EditFailure> {
        let CompilationUnit { types, ids, .. } = self.unit(file)?;
        let mut replaced = Vec::new();
        let mut failure = None;
        for decl in types.iter_mut() {
            rewrite_type(decl, &mut |expr| {
                if failure.is_some() {
                    return;
                }
                let id = expr.id;
                match edit(expr, ids) {
                    Ok(true) => replaced.push(id),
                    Ok(false) => {}
                    Err(err) => failure = Some(err),
                }
            });
        }
        if let Some(err) = failure {
            return Err(err);
        }
        let count = replaced.len();
        for node in replaced {
            self.record(EditOp::Replace {
                file: file.clone(),
                node,
            });
        }
        Ok(count)
    }
}

fn find_type_mut(types: &mut [TypeDecl], id: NodeId) -> Option<&mut TypeDecl> {
    for decl in types {
        if decl.id == id {
            return Some(decl);
        }
        for member in &mut decl.members {
            if let Member::Type(nested) = member {
                if let Some(found) = find_type_mut(std::slice::from_mut(nested), id) {
                    return Some(found);
                }
            }
        }
    }
    None
}
