//! Declaration index.
//!
//! A read-only pre-pass over the translation unit that maps every
//! generatable [`DeclId`] to its declaration. Signatures are derived from
//! this index on demand, so a call may name a function, constructor, or
//! closure that is lowered later in the unit.

use rustc_hash::{FxHashMap, FxHashSet};
use tern_ast::visit::{self, Visitor};
use tern_ast::{
    ClosureExpr, ConstructorDecl, DeclId, DestructorDecl, FuncDecl, NominalTypeDecl,
    StringInterner, TranslationUnit,
};
use tern_ir::{Constant, ConstantKind};

use crate::LowerError;

/// What a [`DeclId`] names.
#[derive(Clone, Copy, Debug)]
pub enum DeclInfo<'ast> {
    Func(&'ast FuncDecl),
    Method {
        decl: &'ast FuncDecl,
        owner: &'ast NominalTypeDecl,
    },
    Constructor {
        decl: &'ast ConstructorDecl,
        owner: &'ast NominalTypeDecl,
    },
    Destructor {
        decl: &'ast DestructorDecl,
        owner: &'ast NominalTypeDecl,
    },
    Nominal(&'ast NominalTypeDecl),
    Closure(&'ast ClosureExpr),
}

/// Every generatable declaration of one translation unit.
#[derive(Debug, Default)]
pub struct DeclIndex<'ast> {
    decls: FxHashMap<DeclId, DeclInfo<'ast>>,
    nominals: Vec<&'ast NominalTypeDecl>,
}

impl<'ast> DeclIndex<'ast> {
    /// Index `unit`, rejecting declarations that share an ID.
    pub fn build(unit: &'ast TranslationUnit) -> Result<Self, LowerError> {
        let mut collector = Collector {
            index: DeclIndex::default(),
            duplicate: None,
        };
        collector.visit_unit(unit);
        match collector.duplicate {
            Some(decl) => Err(LowerError::DuplicateDeclId { decl }),
            None => Ok(collector.index),
        }
    }

    pub fn get(&self, decl: DeclId) -> Option<DeclInfo<'ast>> {
        self.decls.get(&decl).copied()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Nominal types in declaration order, nested types after their owner.
    pub fn nominals(&self) -> &[&'ast NominalTypeDecl] {
        &self.nominals
    }

    /// Reject two nominal types with one name. Layouts and `IrType::Ref`
    /// name types, so nested types must not shadow one another.
    pub fn check_type_names(&self, interner: &StringInterner) -> Result<(), LowerError> {
        let mut seen = FxHashSet::default();
        for nominal in &self.nominals {
            if !seen.insert(nominal.name) {
                return Err(LowerError::DuplicateTypeName {
                    ty: interner.lookup(nominal.name).to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Human-readable symbol for a generated function, e.g. `Node.init!allocator`.
    pub fn symbol(&self, constant: Constant, interner: &StringInterner) -> String {
        let base = match self.get(constant.decl) {
            Some(DeclInfo::Func(func)) => interner.lookup(func.name).to_owned(),
            Some(DeclInfo::Method { decl, owner }) => format!(
                "{}.{}",
                interner.lookup(owner.name),
                interner.lookup(decl.name)
            ),
            Some(DeclInfo::Constructor { owner, .. }) => {
                format!("{}.init", interner.lookup(owner.name))
            }
            Some(DeclInfo::Destructor { owner, .. }) => {
                format!("{}.deinit", interner.lookup(owner.name))
            }
            Some(DeclInfo::Nominal(nominal)) => match constant.kind {
                ConstantKind::Destructor => format!("{}.deinit", interner.lookup(nominal.name)),
                _ => interner.lookup(nominal.name).to_owned(),
            },
            Some(DeclInfo::Closure(closure)) => format!("closure#{}", closure.id.raw()),
            None => format!("decl#{}", constant.decl.raw()),
        };
        match constant.kind {
            ConstantKind::Allocator | ConstantKind::Initializer => {
                format!("{base}!{}", constant.kind.as_str())
            }
            ConstantKind::Primary | ConstantKind::Destructor => base,
        }
    }

    fn insert(&mut self, id: DeclId, info: DeclInfo<'ast>) -> bool {
        self.decls.insert(id, info).is_none()
    }
}

struct Collector<'ast> {
    index: DeclIndex<'ast>,
    duplicate: Option<DeclId>,
}

impl<'ast> Collector<'ast> {
    fn record(&mut self, id: DeclId, info: DeclInfo<'ast>) {
        if !self.index.insert(id, info) && self.duplicate.is_none() {
            self.duplicate = Some(id);
        }
    }
}

impl<'ast> Visitor<'ast> for Collector<'ast> {
    fn visit_func(&mut self, func: &'ast FuncDecl) {
        self.record(func.id, DeclInfo::Func(func));
        visit::walk_func(self, func);
    }

    fn visit_nominal(&mut self, nominal: &'ast NominalTypeDecl) {
        self.record(nominal.id, DeclInfo::Nominal(nominal));
        self.index.nominals.push(nominal);
        visit::walk_nominal(self, nominal);
    }

    fn visit_method(&mut self, owner: &'ast NominalTypeDecl, method: &'ast FuncDecl) {
        self.record(
            method.id,
            DeclInfo::Method {
                decl: method,
                owner,
            },
        );
        visit::walk_func(self, method);
    }

    fn visit_constructor(&mut self, owner: &'ast NominalTypeDecl, ctor: &'ast ConstructorDecl) {
        self.record(ctor.id, DeclInfo::Constructor { decl: ctor, owner });
        if let Some(body) = &ctor.body {
            self.visit_block(body);
        }
    }

    fn visit_destructor(&mut self, owner: &'ast NominalTypeDecl, dtor: &'ast DestructorDecl) {
        self.record(dtor.id, DeclInfo::Destructor { decl: dtor, owner });
        self.visit_block(&dtor.body);
    }

    fn visit_closure(&mut self, closure: &'ast ClosureExpr) {
        self.record(closure.id, DeclInfo::Closure(closure));
        self.visit_block(&closure.body);
    }
}
