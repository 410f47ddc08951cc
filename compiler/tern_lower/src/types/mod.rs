//! Type lowering.
//!
//! Maps semantic types to IR types and derives the calling-convention
//! signature of every [`Constant`]:
//!
//! | Constant | Signature |
//! |---|---|
//! | free function / closure | `(params) -> result` |
//! | method | `(params, self) -> result` |
//! | class allocator | `(params) -> ref T` |
//! | class initializer | `(params, ref T) -> ()` |
//! | struct constructor | `(params) -> T` |
//! | class destructor | `(ref T) -> ()` |
//!
//! Signatures are memoized per constant. The memo doubles as the
//! verifier's signature table: every callee is looked up here before a
//! call to it is emitted.

use rustc_hash::FxHashMap;
use tern_ast::{Name, Param, Semantics, Ty};
use tern_ir::{Constant, ConstantKind, FnType, IrType, TypeLayout, VerifyEnv};

use crate::index::{DeclIndex, DeclInfo};
use crate::LowerError;

/// Lower a semantic type.
pub fn lower_type(ty: &Ty) -> IrType {
    match ty {
        Ty::Unit => IrType::Unit,
        Ty::Int => IrType::Int,
        Ty::Bool => IrType::Bool,
        Ty::Nominal {
            name,
            semantics: Semantics::Reference,
        } => IrType::Ref(*name),
        Ty::Nominal {
            name,
            semantics: Semantics::Value,
        } => IrType::Value(*name),
        Ty::Function { params, result } => IrType::Func(Box::new(FnType::new(
            params.iter().map(lower_type).collect(),
            lower_type(result),
        ))),
    }
}

fn lower_params(params: &[Param]) -> Vec<IrType> {
    params.iter().map(|p| lower_type(&p.ty)).collect()
}

/// Signature table and nominal layouts for one translation unit.
pub struct TypeLowering<'ast> {
    index: DeclIndex<'ast>,
    signatures: FxHashMap<Constant, FnType>,
    layouts: FxHashMap<Name, TypeLayout>,
}

impl<'ast> TypeLowering<'ast> {
    pub fn new(index: DeclIndex<'ast>) -> Self {
        let layouts = index
            .nominals()
            .iter()
            .map(|nominal| {
                let layout = TypeLayout {
                    name: nominal.name,
                    semantics: nominal.semantics,
                    fields: nominal.fields.iter().map(|f| lower_type(&f.ty)).collect(),
                };
                (nominal.name, layout)
            })
            .collect();
        Self {
            index,
            signatures: FxHashMap::default(),
            layouts,
        }
    }

    pub fn index(&self) -> &DeclIndex<'ast> {
        &self.index
    }

    pub fn layout(&self, name: Name) -> Option<&TypeLayout> {
        self.layouts.get(&name)
    }

    /// Layouts of every nominal type, for the finished module.
    pub fn layouts(&self) -> &FxHashMap<Name, TypeLayout> {
        &self.layouts
    }

    /// Signature of `constant`, derived on first request.
    pub fn constant_type(&mut self, constant: Constant) -> Result<FnType, LowerError> {
        if let Some(sig) = self.signatures.get(&constant) {
            return Ok(sig.clone());
        }
        let sig = self.derive_signature(constant)?;
        tracing::trace!(%constant, ?sig, "derived signature");
        self.signatures.insert(constant, sig.clone());
        Ok(sig)
    }

    fn derive_signature(&self, constant: Constant) -> Result<FnType, LowerError> {
        let unknown = || LowerError::UnknownConstant { constant };
        let info = self.index.get(constant.decl).ok_or_else(unknown)?;

        match (info, constant.kind) {
            (DeclInfo::Func(func), ConstantKind::Primary) => Ok(FnType::new(
                lower_params(&func.params),
                lower_type(&func.result),
            )),
            (DeclInfo::Closure(closure), ConstantKind::Primary) => Ok(FnType::new(
                lower_params(&closure.params),
                lower_type(&closure.result),
            )),
            (DeclInfo::Method { decl, owner }, ConstantKind::Primary) => {
                let mut params = lower_params(&decl.params);
                params.push(lower_type(&owner.self_ty()));
                Ok(FnType::new(params, lower_type(&decl.result)))
            }
            (DeclInfo::Constructor { decl, owner }, kind) => {
                let self_ty = lower_type(&owner.self_ty());
                let params = lower_params(&decl.params);
                match (owner.semantics, kind) {
                    (Semantics::Reference, ConstantKind::Allocator)
                    | (Semantics::Value, ConstantKind::Primary) => Ok(FnType::new(params, self_ty)),
                    (Semantics::Reference, ConstantKind::Initializer) => {
                        let mut params = params;
                        params.push(self_ty);
                        Ok(FnType::new(params, IrType::Unit))
                    }
                    _ => Err(unknown()),
                }
            }
            (DeclInfo::Nominal(nominal), ConstantKind::Destructor)
                if nominal.semantics.is_reference() =>
            {
                Ok(FnType::new(
                    vec![lower_type(&nominal.self_ty())],
                    IrType::Unit,
                ))
            }
            _ => Err(unknown()),
        }
    }
}

impl VerifyEnv for TypeLowering<'_> {
    fn signature(&self, constant: Constant) -> Option<&FnType> {
        self.signatures.get(&constant)
    }

    fn layout(&self, name: Name) -> Option<&TypeLayout> {
        self.layouts.get(&name)
    }
}
