//! Per-type lowering state.
//!
//! A [`TypeGen`] walks the members of one nominal type, emitting
//! constructors and methods as it meets them and recording the explicit
//! destructor for the end. [`finish`](TypeGen::finish) emits the destructor
//! of a class whether or not one was declared; a struct must not declare
//! one.

use tern_ast::{DestructorDecl, Member, NominalTypeDecl, Semantics};
use tern_ir::Constant;

use crate::module_gen::ModuleGen;
use crate::LowerError;

pub struct TypeGen<'d> {
    decl: &'d NominalTypeDecl,
    destructor: Option<&'d DestructorDecl>,
}

impl<'d> TypeGen<'d> {
    pub fn new(decl: &'d NominalTypeDecl) -> Self {
        Self {
            decl,
            destructor: None,
        }
    }

    pub fn decl(&self) -> &'d NominalTypeDecl {
        self.decl
    }

    pub fn destructor(&self) -> Option<&'d DestructorDecl> {
        self.destructor
    }

    /// Lower every member in declaration order.
    pub fn visit_members(&mut self, sgm: &mut ModuleGen<'_>) -> Result<(), LowerError> {
        let decl = self.decl;
        for member in &decl.members {
            match member {
                Member::Constructor(ctor) => {
                    sgm.emit_constructor(decl, ctor)?;
                }
                Member::Destructor(dtor) => self.record_destructor(sgm, dtor)?,
                Member::Method(method) => {
                    sgm.emit_function(method)?;
                }
                Member::Nested(nested) => sgm.visit_nominal(nested)?,
            }
        }
        Ok(())
    }

    /// Remember the explicit destructor for [`finish`](Self::finish).
    pub fn record_destructor(
        &mut self,
        sgm: &ModuleGen<'_>,
        dtor: &'d DestructorDecl,
    ) -> Result<(), LowerError> {
        if self.destructor.is_some() {
            return Err(LowerError::DuplicateDestructor {
                ty: sgm.interner().lookup(self.decl.name).to_owned(),
            });
        }
        self.destructor = Some(dtor);
        Ok(())
    }

    /// Emit the destructor of a class. Returns its constant, or `None` for a
    /// struct.
    pub fn finish(self, sgm: &mut ModuleGen<'_>) -> Result<Option<Constant>, LowerError> {
        match self.decl.semantics {
            Semantics::Reference => sgm.emit_destructor(self.decl, self.destructor).map(Some),
            Semantics::Value if self.destructor.is_some() => {
                Err(LowerError::DestructorOnValueType {
                    ty: sgm.interner().lookup(self.decl.name).to_owned(),
                })
            }
            Semantics::Value => Ok(None),
        }
    }
}
