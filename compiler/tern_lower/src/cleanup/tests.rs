use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tern_ast::Name;
use tern_ir::{BlockId, Instr, IrType, Terminator, VarId};

use super::*;

fn node() -> IrType {
    IrType::Ref(Name::from_raw(50))
}

/// Builder with `count` reference-typed variables already allocated.
fn builder_with_refs(count: usize) -> (IrBuilder, Vec<VarId>) {
    let mut builder = IrBuilder::new();
    let vars = (0..count).map(|_| builder.fresh_var(node())).collect();
    (builder, vars)
}

fn released(builder: &IrBuilder, block: BlockId) -> Vec<VarId> {
    builder
        .block_body(block)
        .iter()
        .filter_map(|instr| match instr {
            Instr::Release { var } => Some(*var),
            _ => None,
        })
        .collect()
}

#[test]
fn return_runs_cleanups_in_reverse_order() {
    let (mut builder, vars) = builder_with_refs(3);
    let mut cleanups = CleanupStack::new();
    for &var in &vars {
        cleanups.push(Cleanup::Release { var });
    }

    let unit = builder.emit_unit();
    cleanups
        .emit_return_and_cleanups(&mut builder, unit)
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(
        released(&builder, BlockId::new(0)),
        vec![vars[2], vars[1], vars[0]]
    );
    assert_eq!(
        builder.block_terminator(BlockId::new(0)),
        Some(&Terminator::Return { value: unit })
    );
    assert!(cleanups.is_empty());
    assert!(!builder.has_insertion_point());
}

#[test]
fn second_unwind_is_rejected() {
    let (mut builder, _) = builder_with_refs(0);
    let mut cleanups = CleanupStack::new();
    let unit = builder.emit_unit();
    assert_eq!(cleanups.emit_return_and_cleanups(&mut builder, unit), Ok(()));

    let next = builder.new_block();
    builder.position_at(next);
    let unit = builder.emit_unit();
    assert_eq!(
        cleanups.emit_return_and_cleanups(&mut builder, unit),
        Err(LowerError::CleanupsAlreadyUnwound)
    );
}

#[test]
fn pop_scope_emits_only_inner_cleanups() {
    let (mut builder, vars) = builder_with_refs(3);
    let mut cleanups = CleanupStack::new();
    cleanups.push(Cleanup::Release { var: vars[0] });
    let inner = cleanups.depth();
    cleanups.push(Cleanup::Release { var: vars[1] });
    cleanups.push(Cleanup::Release { var: vars[2] });

    cleanups.pop_scope(inner, &mut builder);

    assert_eq!(released(&builder, BlockId::new(0)), vec![vars[2], vars[1]]);
    assert_eq!(cleanups.entries(), &[Cleanup::Release { var: vars[0] }]);
}

#[test]
fn pop_scope_after_exit_discards_without_emitting() {
    let (mut builder, vars) = builder_with_refs(1);
    let mut cleanups = CleanupStack::new();
    let depth = cleanups.depth();
    cleanups.push(Cleanup::Release { var: vars[0] });
    builder.terminate_unreachable();

    cleanups.pop_scope(depth, &mut builder);

    assert!(released(&builder, BlockId::new(0)).is_empty());
    assert!(cleanups.is_empty());
}

#[test]
fn early_exit_emission_keeps_stack() {
    let (mut builder, vars) = builder_with_refs(2);
    let mut cleanups = CleanupStack::new();
    cleanups.push(Cleanup::Release { var: vars[0] });
    cleanups.push(Cleanup::Release { var: vars[1] });

    cleanups.emit_cleanups_to(CleanupDepth::FUNCTION, &mut builder);

    assert_eq!(released(&builder, BlockId::new(0)), vec![vars[1], vars[0]]);
    assert_eq!(cleanups.depth(), CleanupDepth(2));
}

#[test]
fn field_cleanup_projects_before_release() {
    let (mut builder, vars) = builder_with_refs(1);
    let cleanup = Cleanup::ReleaseField {
        base: vars[0],
        field: 1,
        ty: node(),
    };
    cleanup.emit(&mut builder);

    let body = builder.block_body(BlockId::new(0));
    assert_eq!(body.len(), 2);
    let Instr::Project {
        dst, value, field, ..
    } = &body[0]
    else {
        panic!("expected projection, got {:?}", body[0]);
    };
    assert_eq!((*value, *field), (vars[0], 1));
    assert_eq!(body[1], Instr::Release { var: *dst });
}

proptest! {
    #[test]
    fn unwind_order_is_reverse_of_push_order(count in 0usize..24, split in 0usize..24) {
        let (mut builder, vars) = builder_with_refs(count);
        let mut cleanups = CleanupStack::new();
        let split = split.min(count);

        for &var in &vars[..split] {
            cleanups.push(Cleanup::Release { var });
        }
        let inner = cleanups.depth();
        for &var in &vars[split..] {
            cleanups.push(Cleanup::Release { var });
        }

        cleanups.pop_scope(inner, &mut builder);
        let mut expected: Vec<VarId> = vars[split..].iter().rev().copied().collect();

        let unit = builder.emit_unit();
        prop_assert!(cleanups.emit_return_and_cleanups(&mut builder, unit).is_ok());
        expected.extend(vars[..split].iter().rev().copied());

        prop_assert_eq!(released(&builder, BlockId::new(0)), expected);
    }
}
