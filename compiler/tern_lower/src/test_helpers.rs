//! Shared fixtures for lowering tests.

use tern_ast::{
    Block, ConstructorDecl, Decl, DeclId, DeclIdAllocator, FieldDecl, FuncDecl, Member, Name,
    NominalTypeDecl, Param, Semantics, Stmt, StringInterner, TranslationUnit, Ty, UnitKind,
};
use tern_ir::{Function, Instr, Module, VarId};

use crate::index::DeclIndex;
use crate::module_gen::ModuleGen;
use crate::types::TypeLowering;
use crate::{construct_module, LowerError, LowerOptions};

/// Interner plus a declaration ID source for building units by hand.
pub(crate) struct Fixture {
    pub interner: StringInterner,
    ids: DeclIdAllocator,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            interner: StringInterner::new(),
            ids: DeclIdAllocator::new(),
        }
    }

    pub fn name(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub fn fresh_id(&mut self) -> DeclId {
        self.ids.fresh()
    }

    pub fn param(&self, name: &str, ty: Ty) -> Param {
        Param {
            name: self.name(name),
            ty,
        }
    }

    pub fn func(&mut self, name: &str, params: Vec<Param>, result: Ty, body: Vec<Stmt>) -> FuncDecl {
        FuncDecl {
            id: self.fresh_id(),
            name: self.name(name),
            params,
            result,
            body: Some(Block::new(body)),
        }
    }

    pub fn ctor(&mut self, params: Vec<Param>, body: Option<Vec<Stmt>>) -> ConstructorDecl {
        ConstructorDecl {
            id: self.fresh_id(),
            params,
            body: body.map(Block::new),
        }
    }

    pub fn nominal(
        &mut self,
        name: &str,
        semantics: Semantics,
        fields: Vec<(&str, Ty)>,
        members: Vec<Member>,
    ) -> NominalTypeDecl {
        NominalTypeDecl {
            id: self.fresh_id(),
            name: self.name(name),
            semantics,
            fields: fields
                .into_iter()
                .map(|(field, ty)| FieldDecl {
                    name: self.name(field),
                    ty,
                })
                .collect(),
            members,
        }
    }

    pub fn lower(&self, kind: UnitKind, decls: Vec<Decl>) -> Result<Module, LowerError> {
        let unit = TranslationUnit { kind, decls };
        construct_module(&unit, &self.interner, LowerOptions::default())
    }
}

/// Run `f` against a fresh `ModuleGen` for `unit`, without lowering any
/// of its declarations.
pub(crate) fn with_module_gen<R>(
    fx: &Fixture,
    unit: &TranslationUnit,
    f: impl FnOnce(&mut ModuleGen<'_>) -> R,
) -> R {
    let index = DeclIndex::build(unit).unwrap_or_else(|e| panic!("{e}"));
    let mut sgm = ModuleGen::new(
        TypeLowering::new(index),
        &fx.interner,
        unit.kind.has_toplevel(),
        LowerOptions::default(),
    );
    f(&mut sgm)
}

/// Variables released, in instruction order.
pub(crate) fn releases(func: &Function) -> Vec<VarId> {
    func.instrs()
        .filter_map(|instr| match instr {
            Instr::Release { var } => Some(*var),
            _ => None,
        })
        .collect()
}

/// Variables retained, in instruction order.
pub(crate) fn retains(func: &Function) -> Vec<VarId> {
    func.instrs()
        .filter_map(|instr| match instr {
            Instr::Retain { var } => Some(*var),
            _ => None,
        })
        .collect()
}

/// Look up a function that must exist.
pub(crate) fn expect_function(module: &Module, constant: tern_ir::Constant) -> &Function {
    module
        .function(constant)
        .unwrap_or_else(|| panic!("no function for {constant}"))
}
