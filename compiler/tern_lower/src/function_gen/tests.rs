use pretty_assertions::assert_eq;
use tern_ast::Name;
use tern_ir::{BlockId, FnType, Instr, IrType, Literal, Terminator, VarId};

use super::*;

fn unit_sig() -> FnType {
    FnType::new(vec![], IrType::Unit)
}

fn open(sig: FnType, implicit_unit_return: bool) -> FunctionGen {
    FunctionGen::open(Name::from_raw(1), "f".to_owned(), sig, implicit_unit_return)
}

fn releases(func: &Function) -> Vec<VarId> {
    func.instrs()
        .filter_map(|instr| match instr {
            Instr::Release { var } => Some(*var),
            _ => None,
        })
        .collect()
}

#[test]
fn open_binds_parameters() {
    let fgen = open(FnType::new(vec![IrType::Int, IrType::Bool], IrType::Unit), true);
    assert_eq!(fgen.params(), &[VarId::new(0), VarId::new(1)]);
    assert_eq!(fgen.var_type(VarId::new(1)), Some(&IrType::Bool));
    assert!(fgen.epilog().is_none());
}

#[test]
fn implicit_unit_return_unwinds_cleanups() {
    let node = IrType::Ref(Name::from_raw(9));
    let mut fgen = open(unit_sig(), true);
    let vars: Vec<VarId> = (0..3)
        .map(|_| fgen.builder.emit_alloc(node.clone()))
        .collect();
    for &var in &vars {
        fgen.push_cleanup(Cleanup::Release { var });
    }

    let func = fgen.close().unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(releases(&func), vec![vars[2], vars[1], vars[0]]);
    assert_eq!(func.return_count(), 1);
    let Some(Terminator::Return { value }) = &func.blocks[0].terminator else {
        panic!("entry block should return");
    };
    assert_eq!(func.var_type(*value), Some(&IrType::Unit));
}

#[test]
fn falling_off_without_implicit_return_is_unreachable() {
    let mut fgen = open(FnType::new(vec![], IrType::Int), false);
    fgen.builder.emit_literal(Literal::Int(1));
    let func = fgen.close().unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(func.blocks[0].terminator, Some(Terminator::Unreachable));
    assert_eq!(func.return_count(), 0);
}

#[test]
fn close_after_terminator_emits_nothing() {
    let mut fgen = open(FnType::new(vec![], IrType::Int), true);
    let one = fgen.builder.emit_literal(Literal::Int(1));
    fgen.emit_trailing_return(one)
        .unwrap_or_else(|e| panic!("{e}"));

    let func = fgen.close().unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(func.blocks.len(), 1);
    assert_eq!(func.blocks[0].body.len(), 1);
    assert_eq!(
        func.blocks[0].terminator,
        Some(Terminator::Return { value: one })
    );
}

#[test]
fn epilog_with_reachable_end_conflicts_with_implicit_return() {
    let mut fgen = open(unit_sig(), true);
    fgen.get_or_create_epilog();
    assert_eq!(
        fgen.close().err(),
        Some(LowerError::EpilogConflict {
            function: "f".to_owned()
        })
    );
}

#[test]
fn explicit_returns_share_one_epilog() {
    let mut fgen = open(FnType::new(vec![IrType::Bool], IrType::Int), false);
    let cond = fgen.params()[0];
    let then_bb = fgen.builder.new_block();
    let else_bb = fgen.builder.new_block();
    fgen.builder.terminate_branch(cond, then_bb, else_bb);

    fgen.builder.position_at(then_bb);
    let one = fgen.builder.emit_literal(Literal::Int(1));
    fgen.emit_return(one);

    fgen.builder.position_at(else_bb);
    let two = fgen.builder.emit_literal(Literal::Int(2));
    fgen.emit_return(two);

    fgen.finish_body();
    let epilog = fgen.epilog().unwrap_or_else(|| panic!("no epilog"));
    let func = fgen.close().unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(func.return_count(), 1);
    let epilog_block = &func.blocks[epilog.block.index()];
    assert_eq!(epilog_block.params, vec![(epilog.value, IrType::Int)]);
    assert_eq!(
        epilog_block.terminator,
        Some(Terminator::Return {
            value: epilog.value
        })
    );
    for block in [then_bb, else_bb] {
        assert!(matches!(
            func.blocks[block.index()].terminator,
            Some(Terminator::Jump { target, .. }) if target == epilog.block
        ));
    }
}

#[test]
fn finish_body_routes_unit_fallthrough_into_epilog() {
    let node = IrType::Ref(Name::from_raw(9));
    let mut fgen = open(unit_sig(), true);
    let obj = fgen.builder.emit_alloc(node);
    fgen.push_cleanup(Cleanup::Release { var: obj });

    // An early return in a side block, then fall-through in the entry path.
    let side = fgen.builder.new_block();
    let rest = fgen.builder.new_block();
    let cond = fgen.builder.emit_literal(Literal::Bool(true));
    fgen.builder.terminate_branch(cond, side, rest);
    fgen.builder.position_at(side);
    let unit = fgen.builder.emit_unit();
    fgen.emit_return(unit);
    fgen.builder.position_at(rest);

    fgen.finish_body();
    assert!(!fgen.builder.has_insertion_point());
    let func = fgen.close().unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(func.return_count(), 1);
    // Each exit path releases the object once.
    assert_eq!(releases(&func), vec![obj, obj]);
    assert!(matches!(
        func.blocks[rest.index()].terminator,
        Some(Terminator::Jump { .. })
    ));
}

#[test]
fn non_unit_fallthrough_with_epilog_is_unreachable() {
    let mut fgen = open(FnType::new(vec![], IrType::Int), false);
    let one = fgen.builder.emit_literal(Literal::Int(1));
    let side = fgen.builder.new_block();
    let rest = fgen.builder.new_block();
    let cond = fgen.builder.emit_literal(Literal::Bool(false));
    fgen.builder.terminate_branch(cond, side, rest);
    fgen.builder.position_at(side);
    fgen.emit_return(one);
    fgen.builder.position_at(rest);

    fgen.finish_body();
    let func = fgen.close().unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(
        func.blocks[rest.index()].terminator,
        Some(Terminator::Unreachable)
    );
    assert_eq!(func.block(BlockId::new(0)).map(|b| b.body.len()), Some(2));
}

#[test]
fn code_after_return_is_rejected_on_close() {
    let mut fgen = open(unit_sig(), true);
    let first = fgen.builder.emit_unit();
    fgen.builder.terminate_return(first);
    let second = fgen.builder.emit_unit();
    fgen.builder.terminate_return(second);

    assert_eq!(
        fgen.close().err(),
        Some(LowerError::Malformed {
            function: "f".to_owned(),
            message: "code emitted after a terminator into bb1".to_owned(),
        })
    );
}
