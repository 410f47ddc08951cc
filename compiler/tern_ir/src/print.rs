//! Textual rendering of IR for verbose dumps and test expectations.

use std::fmt::Write;

use tern_ast::StringInterner;

use crate::{Block, FnType, Function, Instr, IrType, Literal, Terminator, Value, VarId};

/// Renders IR with names resolved through an interner.
pub struct Printer<'a> {
    interner: &'a StringInterner,
}

impl<'a> Printer<'a> {
    pub fn new(interner: &'a StringInterner) -> Self {
        Self { interner }
    }

    pub fn ty(&self, ty: &IrType) -> String {
        match ty {
            IrType::Unit => "()".to_owned(),
            IrType::Int => "int".to_owned(),
            IrType::Bool => "bool".to_owned(),
            IrType::Ref(name) => format!("ref {}", self.interner.lookup(*name)),
            IrType::Value(name) => self.interner.lookup(*name).to_owned(),
            IrType::Func(sig) => self.fn_type(sig),
        }
    }

    pub fn fn_type(&self, sig: &FnType) -> String {
        let params: Vec<String> = sig.params.iter().map(|p| self.ty(p)).collect();
        format!("({}) -> {}", params.join(", "), self.ty(&sig.result))
    }

    pub fn function(&self, func: &Function) -> String {
        let mut out = String::new();
        let params: Vec<String> = func
            .params
            .iter()
            .zip(&func.sig.params)
            .map(|(var, ty)| format!("{}: {}", var_name(*var), self.ty(ty)))
            .collect();
        let _ = writeln!(
            out,
            "fn {}({}) -> {} {{",
            self.interner.lookup(func.name),
            params.join(", "),
            self.ty(&func.sig.result)
        );
        for block in &func.blocks {
            self.block(&mut out, block);
        }
        out.push('}');
        out
    }

    fn block(&self, out: &mut String, block: &Block) {
        if block.params.is_empty() {
            let _ = writeln!(out, "bb{}:", block.id.raw());
        } else {
            let params: Vec<String> = block
                .params
                .iter()
                .map(|(var, ty)| format!("{}: {}", var_name(*var), self.ty(ty)))
                .collect();
            let _ = writeln!(out, "bb{}({}):", block.id.raw(), params.join(", "));
        }
        for instr in &block.body {
            let _ = writeln!(out, "    {}", self.instr(instr));
        }
        let terminator = match &block.terminator {
            Some(terminator) => terminator_text(terminator),
            None => "<open>".to_owned(),
        };
        let _ = writeln!(out, "    {terminator}");
    }

    fn instr(&self, instr: &Instr) -> String {
        match instr {
            Instr::Let { dst, ty, value } => {
                let rhs = match value {
                    Value::Var(var) => var_name(*var),
                    Value::Literal(Literal::Unit) => "()".to_owned(),
                    Value::Literal(Literal::Int(n)) => n.to_string(),
                    Value::Literal(Literal::Bool(b)) => b.to_string(),
                    Value::PrimOp { op, args } => {
                        let args: Vec<String> = args.iter().map(|a| var_name(*a)).collect();
                        args.join(&format!(" {} ", op.as_symbol()))
                    }
                    Value::Zeroed => "zeroed".to_owned(),
                };
                format!("{}: {} = {rhs}", var_name(*dst), self.ty(ty))
            }
            Instr::Apply {
                dst,
                ty,
                func,
                args,
            } => format!(
                "{}: {} = apply {func}({})",
                var_name(*dst),
                self.ty(ty),
                var_list(args)
            ),
            Instr::ApplyIndirect {
                dst,
                ty,
                callee,
                args,
            } => format!(
                "{}: {} = apply_indirect {}({})",
                var_name(*dst),
                self.ty(ty),
                var_name(*callee),
                var_list(args)
            ),
            Instr::FunctionRef { dst, ty, func } => {
                format!("{}: {} = function_ref {func}", var_name(*dst), self.ty(ty))
            }
            Instr::Alloc { dst, ty } => format!("{}: {} = alloc", var_name(*dst), self.ty(ty)),
            Instr::Project {
                dst,
                ty,
                value,
                field,
            } => format!(
                "{}: {} = project {}.{field}",
                var_name(*dst),
                self.ty(ty),
                var_name(*value)
            ),
            Instr::Set { base, field, value } => {
                format!("set {}.{field} = {}", var_name(*base), var_name(*value))
            }
            Instr::Retain { var } => format!("retain {}", var_name(*var)),
            Instr::Release { var } => format!("release {}", var_name(*var)),
        }
    }
}

fn var_name(var: VarId) -> String {
    format!("%{}", var.raw())
}

fn var_list(vars: &[VarId]) -> String {
    vars.iter().map(|v| var_name(*v)).collect::<Vec<_>>().join(", ")
}

fn terminator_text(terminator: &Terminator) -> String {
    match terminator {
        Terminator::Return { value } => format!("return {}", var_name(*value)),
        Terminator::Jump { target, args } if args.is_empty() => format!("jump bb{}", target.raw()),
        Terminator::Jump { target, args } => format!("jump bb{}({})", target.raw(), var_list(args)),
        Terminator::Branch {
            cond,
            then_block,
            else_block,
        } => format!(
            "branch {}, bb{}, bb{}",
            var_name(*cond),
            then_block.raw(),
            else_block.raw()
        ),
        Terminator::Unreachable => "unreachable".to_owned(),
    }
}
