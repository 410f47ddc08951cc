//! Module-level lowering.
//!
//! [`ModuleGen`] receives the declarations of one translation unit in
//! source order, emits a function per generatable [`Constant`], and owns
//! the function table until [`finish`](ModuleGen::finish) hands it out as a
//! [`Module`].
//!
//! Every function goes through the same sequence in
//! [`emit_with`](ModuleGen::emit_with): check that the constant has no
//! function yet, derive its signature, open a [`FunctionGen`], lower the
//! body, close, verify, and register. No function enters the table without
//! passing the verifier.

use rustc_hash::FxHashMap;
use tern_ast::{
    ClosureExpr, ConstructorDecl, Decl, DestructorDecl, FuncDecl, NominalTypeDecl, Semantics,
    StringInterner, TopLevelCodeDecl,
};
use tern_ir::{verify_function, Constant, FnType, Function, IrType, Module, Printer};

use crate::body::{self, LexicalScope};
use crate::function_gen::FunctionGen;
use crate::index::DeclInfo;
use crate::type_gen::TypeGen;
use crate::types::TypeLowering;
use crate::{LowerError, LowerOptions};

/// Symbol of the implicit entry function.
const TOPLEVEL_SYMBOL: &str = "main";

/// The implicit entry function and the bindings its code has made so far.
struct Toplevel {
    fgen: FunctionGen,
    scope: LexicalScope,
}

pub struct ModuleGen<'ast> {
    interner: &'ast StringInterner,
    pub(crate) types: TypeLowering<'ast>,
    functions: FxHashMap<Constant, Function>,
    toplevel: Option<Toplevel>,
    options: LowerOptions,
}

impl<'ast> ModuleGen<'ast> {
    /// Start lowering a unit.
    ///
    /// With `has_toplevel`, the implicit entry function is opened now and
    /// collects top-level code until [`finish`](Self::finish).
    pub fn new(
        types: TypeLowering<'ast>,
        interner: &'ast StringInterner,
        has_toplevel: bool,
        options: LowerOptions,
    ) -> Self {
        let toplevel = has_toplevel.then(|| {
            let sig = FnType::new(vec![], IrType::Unit);
            if options.verbose {
                eprintln!(
                    "{TOPLEVEL_SYMBOL} : {}",
                    Printer::new(interner).fn_type(&sig)
                );
            }
            Toplevel {
                fgen: FunctionGen::open(
                    interner.intern(TOPLEVEL_SYMBOL),
                    TOPLEVEL_SYMBOL.to_owned(),
                    sig,
                    true,
                ),
                scope: LexicalScope::new(),
            }
        });
        Self {
            interner,
            types,
            functions: FxHashMap::default(),
            toplevel,
            options,
        }
    }

    #[inline]
    pub fn interner(&self) -> &'ast StringInterner {
        self.interner
    }

    pub fn has_function(&self, constant: Constant) -> bool {
        self.functions.contains_key(&constant)
    }

    pub fn function(&self, constant: Constant) -> Option<&Function> {
        self.functions.get(&constant)
    }

    // Declaration dispatch

    pub fn visit_decl(&mut self, decl: &Decl) -> Result<(), LowerError> {
        match decl {
            Decl::Func(func) => self.emit_function(func).map(drop),
            Decl::PatternBinding(binding) => {
                // Global storage has no lowering yet.
                tracing::debug!(
                    name = self.interner.lookup(binding.name),
                    "skipping global binding"
                );
                Ok(())
            }
            Decl::Nominal(nominal) => self.visit_nominal(nominal),
            Decl::TopLevelCode(code) => self.emit_toplevel_code(code),
        }
    }

    /// Lower a nominal type's members, then its destructor.
    pub fn visit_nominal(&mut self, decl: &NominalTypeDecl) -> Result<(), LowerError> {
        let mut type_gen = TypeGen::new(decl);
        type_gen.visit_members(self)?;
        type_gen.finish(self).map(drop)
    }

    fn emit_toplevel_code(&mut self, code: &TopLevelCodeDecl) -> Result<(), LowerError> {
        let Some(mut toplevel) = self.toplevel.take() else {
            return Err(LowerError::MissingToplevel);
        };
        let result = body::emit_toplevel_code(
            self,
            &mut toplevel.fgen,
            &mut toplevel.scope,
            &code.body.stmts,
        );
        self.toplevel = Some(toplevel);
        result
    }

    // Function emission

    /// Emit a free function or method. Prototypes produce nothing.
    pub fn emit_function(&mut self, func: &FuncDecl) -> Result<Option<Constant>, LowerError> {
        let Some(body) = &func.body else {
            tracing::trace!(decl = func.id.raw(), "prototype; nothing to emit");
            return Ok(None);
        };
        let constant = Constant::primary(func.id);
        let is_method = matches!(
            self.types.index().get(func.id),
            Some(DeclInfo::Method { .. })
        );
        self.emit_with(constant, func.result.is_unit(), |sgm, fgen| {
            body::emit_function_body(sgm, fgen, func, is_method, body)
        })?;
        Ok(Some(constant))
    }

    /// Emit a constructor: allocator then initializer for a class, a single
    /// function for a struct. Returns the entry point construction calls.
    pub fn emit_constructor(
        &mut self,
        owner: &NominalTypeDecl,
        ctor: &ConstructorDecl,
    ) -> Result<Option<Constant>, LowerError> {
        let Some(body) = &ctor.body else {
            tracing::trace!(decl = ctor.id.raw(), "constructor prototype; nothing to emit");
            return Ok(None);
        };
        match owner.semantics {
            Semantics::Reference => {
                let allocator = Constant::allocator(ctor.id);
                let initializer = Constant::initializer(ctor.id);
                self.emit_with(allocator, true, |sgm, fgen| {
                    body::emit_class_allocator(sgm, fgen, initializer)
                })?;
                self.emit_with(initializer, true, |sgm, fgen| {
                    body::emit_class_initializer(sgm, fgen, ctor, body)
                })?;
                Ok(Some(allocator))
            }
            Semantics::Value => {
                let constant = Constant::primary(ctor.id);
                self.emit_with(constant, true, |sgm, fgen| {
                    body::emit_value_constructor(sgm, fgen, ctor, body)
                })?;
                Ok(Some(constant))
            }
        }
    }

    /// Emit a closure. The end of a closure body is never an implicit
    /// return.
    pub fn emit_closure(&mut self, closure: &ClosureExpr) -> Result<Constant, LowerError> {
        let constant = Constant::primary(closure.id);
        self.emit_with(constant, false, |sgm, fgen| {
            body::emit_closure_body(sgm, fgen, closure)
        })?;
        Ok(constant)
    }

    /// Emit the destructor of a class, from its `deinit` if it has one.
    pub fn emit_destructor(
        &mut self,
        owner: &NominalTypeDecl,
        dtor: Option<&DestructorDecl>,
    ) -> Result<Constant, LowerError> {
        if !owner.semantics.is_reference() {
            return Err(LowerError::DestructorOnValueType {
                ty: self.interner.lookup(owner.name).to_owned(),
            });
        }
        let constant = Constant::destructor(owner.id);
        self.emit_with(constant, true, |sgm, fgen| {
            body::emit_destructor_body(sgm, fgen, owner, dtor.map(|d| &d.body))
        })?;
        Ok(constant)
    }

    /// Open, lower, close, verify, and register the function for `constant`.
    pub fn emit_with<F>(
        &mut self,
        constant: Constant,
        implicit_unit_return: bool,
        lower: F,
    ) -> Result<(), LowerError>
    where
        F: FnOnce(&mut Self, &mut FunctionGen) -> Result<(), LowerError>,
    {
        let symbol = self.types.index().symbol(constant, self.interner);
        if self.functions.contains_key(&constant) {
            return Err(LowerError::DuplicateDefinition { constant, symbol });
        }
        let sig = self.types.constant_type(constant)?;
        if self.options.verbose {
            eprintln!(
                "{symbol} {constant} : {}",
                Printer::new(self.interner).fn_type(&sig)
            );
        }
        tracing::debug!(%constant, symbol = %symbol, "emitting function");

        let name = self.interner.intern(&symbol);
        let mut fgen = FunctionGen::open(name, symbol, sig, implicit_unit_return);
        lower(self, &mut fgen)?;
        let symbol = fgen.symbol().to_owned();
        let function = fgen.close()?;

        self.check(Some(constant), &symbol, &function)?;
        // A nested emission may have claimed the constant while this body
        // was being lowered.
        if self.functions.contains_key(&constant) {
            return Err(LowerError::DuplicateDefinition { constant, symbol });
        }
        self.functions.insert(constant, function);
        Ok(())
    }

    /// Dump (in verbose mode) and verify a closed function.
    fn check(
        &self,
        constant: Option<Constant>,
        symbol: &str,
        function: &Function,
    ) -> Result<(), LowerError> {
        if self.options.verbose {
            eprintln!("{}", Printer::new(self.interner).function(function));
        }
        verify_function(function, &self.types).map_err(|errors| LowerError::Verification {
            function: symbol.to_owned(),
            constant,
            errors,
        })
    }

    /// Close the entry function, if any, and produce the module.
    pub fn finish(mut self) -> Result<Module, LowerError> {
        let toplevel = match self.toplevel.take() {
            Some(Toplevel { fgen, .. }) => {
                let function = fgen.close()?;
                self.check(None, TOPLEVEL_SYMBOL, &function)?;
                Some(function)
            }
            None => None,
        };
        tracing::debug!(
            functions = self.functions.len(),
            toplevel = toplevel.is_some(),
            "module lowered"
        );
        Ok(Module {
            functions: self.functions,
            toplevel,
            layouts: self.types.layouts().clone(),
        })
    }
}
