//! Whole-unit lowering, checked against printed IR.

use pretty_assertions::assert_eq;
use tern_ast::{
    BinaryOp, Block, ClosureExpr, ConstructorDecl, Decl, DeclId, DestructorDecl, Expr, FieldDecl,
    FuncDecl, Member, NominalTypeDecl, Param, Semantics, Stmt, StringInterner, TopLevelCodeDecl,
    TranslationUnit, Ty, UnitKind,
};
use tern_ir::{Constant, ConstantKind, Instr, Module, Printer, Terminator};
use tern_lower::{construct_module, LowerOptions};

fn param(interner: &StringInterner, name: &str, ty: Ty) -> Param {
    Param {
        name: interner.intern(name),
        ty,
    }
}

fn func(
    interner: &StringInterner,
    id: u32,
    name: &str,
    params: Vec<Param>,
    result: Ty,
    body: Option<Vec<Stmt>>,
) -> FuncDecl {
    FuncDecl {
        id: DeclId::new(id),
        name: interner.intern(name),
        params,
        result,
        body: body.map(Block::new),
    }
}

fn nominal(
    interner: &StringInterner,
    id: u32,
    name: &str,
    semantics: Semantics,
    fields: &[(&str, Ty)],
    members: Vec<Member>,
) -> NominalTypeDecl {
    NominalTypeDecl {
        id: DeclId::new(id),
        name: interner.intern(name),
        semantics,
        fields: fields
            .iter()
            .map(|(field, ty)| FieldDecl {
                name: interner.intern(field),
                ty: ty.clone(),
            })
            .collect(),
        members,
    }
}

fn var(interner: &StringInterner, name: &str) -> Expr {
    Expr::Var(interner.intern(name))
}

fn lower(interner: &StringInterner, kind: UnitKind, decls: Vec<Decl>) -> Module {
    let unit = TranslationUnit { kind, decls };
    construct_module(&unit, interner, LowerOptions::default()).unwrap_or_else(|e| panic!("{e}"))
}

fn printed(interner: &StringInterner, module: &Module, constant: Constant) -> String {
    let func = module
        .function(constant)
        .unwrap_or_else(|| panic!("no function for {constant}"));
    Printer::new(interner).function(func)
}

/// `class Leaf {}` and a `Node` class that stores a `Leaf` from its
/// constructor.
fn tree_library(interner: &StringInterner) -> Vec<Decl> {
    let leaf = Ty::class(interner.intern("Leaf"));
    let ctor = ConstructorDecl {
        id: DeclId::new(2),
        params: vec![param(interner, "child", leaf.clone())],
        body: Some(Block::new(vec![Stmt::AssignField {
            base: Expr::SelfRef,
            field: 1,
            value: var(interner, "child"),
        }])),
    };
    vec![
        Decl::Nominal(nominal(
            interner,
            0,
            "Leaf",
            Semantics::Reference,
            &[],
            vec![],
        )),
        Decl::Nominal(nominal(
            interner,
            1,
            "Node",
            Semantics::Reference,
            &[("value", Ty::Int), ("child", leaf)],
            vec![Member::Constructor(ctor)],
        )),
    ]
}

#[test]
fn class_library_lowers_constructors_and_destructors() {
    let interner = StringInterner::new();
    let module = lower(&interner, UnitKind::Library, tree_library(&interner));

    assert!(module.toplevel.is_none());
    assert_eq!(
        module.constants_of_kind(ConstantKind::Destructor),
        vec![
            Constant::destructor(DeclId::new(0)),
            Constant::destructor(DeclId::new(1)),
        ]
    );

    assert_eq!(
        printed(&interner, &module, Constant::destructor(DeclId::new(0))),
        "\
fn Leaf.deinit(%0: ref Leaf) -> () {
bb0:
    %1: () = ()
    return %1
}"
    );
    assert_eq!(
        printed(&interner, &module, Constant::initializer(DeclId::new(2))),
        "\
fn Node.init!initializer(%0: ref Leaf, %1: ref Node) -> () {
bb0:
    retain %0
    set %1.1 = %0
    %2: () = ()
    return %2
}"
    );
    assert_eq!(
        printed(&interner, &module, Constant::allocator(DeclId::new(2))),
        "\
fn Node.init!allocator(%0: ref Leaf) -> ref Node {
bb0:
    %1: ref Node = alloc
    %2: () = apply @2!initializer(%0, %1)
    return %1
}"
    );
    assert_eq!(
        printed(&interner, &module, Constant::destructor(DeclId::new(1))),
        "\
fn Node.deinit(%0: ref Node) -> () {
bb0:
    %1: () = ()
    %2: ref Leaf = project %0.1
    release %2
    return %1
}"
    );
}

/// `struct Point { x, y }` with a memberwise constructor, a `sum`
/// function, a `Widget` class with only a `deinit`, and top-level code
/// using `Point` and `sum`.
fn point_program(interner: &StringInterner) -> Vec<Decl> {
    let point = Ty::structure(interner.intern("Point"));
    let ctor = ConstructorDecl {
        id: DeclId::new(1),
        params: vec![
            param(interner, "x", Ty::Int),
            param(interner, "y", Ty::Int),
        ],
        body: Some(Block::new(vec![
            Stmt::AssignField {
                base: Expr::SelfRef,
                field: 0,
                value: var(interner, "x"),
            },
            Stmt::AssignField {
                base: Expr::SelfRef,
                field: 1,
                value: var(interner, "y"),
            },
        ])),
    };
    let field = |index| Expr::Field {
        base: Box::new(var(interner, "p")),
        field: index,
    };
    let sum = func(
        interner,
        2,
        "sum",
        vec![param(interner, "p", point.clone())],
        Ty::Int,
        Some(vec![Stmt::Return(Some(Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(field(0)),
            rhs: Box::new(field(1)),
        }))]),
    );
    vec![
        Decl::Nominal(nominal(
            interner,
            0,
            "Point",
            Semantics::Value,
            &[("x", Ty::Int), ("y", Ty::Int)],
            vec![Member::Constructor(ctor)],
        )),
        Decl::Func(sum),
        Decl::Nominal(nominal(
            interner,
            3,
            "Widget",
            Semantics::Reference,
            &[],
            vec![Member::Destructor(DestructorDecl {
                id: DeclId::new(4),
                body: Block::empty(),
            })],
        )),
        Decl::TopLevelCode(TopLevelCodeDecl {
            body: Block::new(vec![
                Stmt::Let {
                    name: interner.intern("p"),
                    ty: point,
                    init: Expr::New {
                        ctor: DeclId::new(1),
                        args: vec![Expr::Int(1), Expr::Int(2)],
                    },
                },
                Stmt::Expr(Expr::Call {
                    callee: DeclId::new(2),
                    args: vec![var(interner, "p")],
                }),
            ]),
        }),
    ]
}

#[test]
fn executable_lowers_types_functions_and_entry() {
    let interner = StringInterner::new();
    let module = lower(&interner, UnitKind::Executable, point_program(&interner));

    assert_eq!(
        printed(&interner, &module, Constant::primary(DeclId::new(1))),
        "\
fn Point.init(%0: int, %1: int) -> Point {
bb0:
    %2: Point = zeroed
    set %2.0 = %0
    set %2.1 = %1
    return %2
}"
    );
    assert_eq!(
        printed(&interner, &module, Constant::primary(DeclId::new(2))),
        "\
fn sum(%0: Point) -> int {
bb0:
    %1: int = project %0.0
    %2: int = project %0.1
    %3: int = %1 + %2
    jump bb1(%3)
bb1(%4: int):
    return %4
}"
    );

    let main = module
        .toplevel
        .as_ref()
        .unwrap_or_else(|| panic!("executable without entry function"));
    assert_eq!(
        Printer::new(&interner).function(main),
        "\
fn main() -> () {
bb0:
    %0: int = 1
    %1: int = 2
    %2: Point = apply @1(%0, %1)
    %3: int = apply @2(%2)
    %4: () = ()
    return %4
}"
    );
    // No allocator or initializer for `Widget`, and no destructor for the
    // struct.
    assert_eq!(
        module.sorted_constants(),
        vec![
            Constant::primary(DeclId::new(1)),
            Constant::primary(DeclId::new(2)),
            Constant::destructor(DeclId::new(3)),
        ]
    );
}

#[test]
fn cleanups_unwind_in_reverse_binding_order() {
    let interner = StringInterner::new();
    let leaf = Ty::class(interner.intern("Leaf"));
    let mut decls = tree_library(&interner);
    decls.push(Decl::Func(func(
        &interner,
        3,
        "make",
        vec![],
        leaf.clone(),
        None,
    )));
    let bindings = ["c1", "c2", "c3"].map(|name| Stmt::Let {
        name: interner.intern(name),
        ty: leaf.clone(),
        init: Expr::Call {
            callee: DeclId::new(3),
            args: vec![],
        },
    });
    decls.push(Decl::Func(func(
        &interner,
        4,
        "three",
        vec![],
        Ty::Unit,
        Some(bindings.to_vec()),
    )));
    let module = lower(&interner, UnitKind::Library, decls);

    assert_eq!(
        printed(&interner, &module, Constant::primary(DeclId::new(4))),
        "\
fn three() -> () {
bb0:
    %0: ref Leaf = apply @3()
    %1: ref Leaf = apply @3()
    %2: ref Leaf = apply @3()
    %3: () = ()
    release %2
    release %1
    release %0
    return %3
}"
    );
    // Prototypes are callable but have no body.
    assert!(!module.has_function(Constant::primary(DeclId::new(3))));
}

#[test]
fn early_returns_share_one_epilog() {
    let interner = StringInterner::new();
    let n = || var(&interner, "n");
    let abs = func(
        &interner,
        0,
        "abs",
        vec![param(&interner, "n", Ty::Int)],
        Ty::Int,
        Some(vec![
            Stmt::If {
                cond: Expr::Binary {
                    op: BinaryOp::Lt,
                    lhs: Box::new(n()),
                    rhs: Box::new(Expr::Int(0)),
                },
                then_block: Block::new(vec![Stmt::Return(Some(Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: Box::new(Expr::Int(0)),
                    rhs: Box::new(n()),
                }))]),
                else_block: None,
            },
            Stmt::Return(Some(n())),
        ]),
    );
    let module = lower(&interner, UnitKind::Library, vec![Decl::Func(abs)]);

    assert_eq!(
        printed(&interner, &module, Constant::primary(DeclId::new(0))),
        "\
fn abs(%0: int) -> int {
bb0:
    %1: int = 0
    %2: bool = %0 < %1
    branch %2, bb1, bb2
bb1:
    %3: int = 0
    %4: int = %3 - %0
    jump bb3(%4)
bb2:
    jump bb3(%0)
bb3(%5: int):
    return %5
}"
    );
}

#[test]
fn calls_may_name_functions_declared_later() {
    let interner = StringInterner::new();
    let caller = func(
        &interner,
        0,
        "caller",
        vec![],
        Ty::Int,
        Some(vec![Stmt::Return(Some(Expr::Call {
            callee: DeclId::new(1),
            args: vec![Expr::Bool(true)],
        }))]),
    );
    let callee = func(
        &interner,
        1,
        "callee",
        vec![param(&interner, "flag", Ty::Bool)],
        Ty::Int,
        Some(vec![Stmt::Return(Some(Expr::Int(7)))]),
    );
    let module = lower(
        &interner,
        UnitKind::Library,
        vec![Decl::Func(caller), Decl::Func(callee)],
    );

    assert_eq!(
        module.sorted_constants(),
        vec![
            Constant::primary(DeclId::new(0)),
            Constant::primary(DeclId::new(1)),
        ]
    );
    let caller = module
        .function(Constant::primary(DeclId::new(0)))
        .unwrap_or_else(|| panic!("caller missing"));
    assert!(caller.instrs().any(|instr| matches!(
        instr,
        Instr::Apply { func, .. } if *func == Constant::primary(DeclId::new(1))
    )));
}

#[test]
fn closure_without_return_ends_unreachable() {
    let interner = StringInterner::new();
    let closure = ClosureExpr {
        id: DeclId::new(1),
        params: vec![param(&interner, "x", Ty::Int)],
        result: Ty::Int,
        body: Block::new(vec![Stmt::Expr(var(&interner, "x"))]),
    };
    let outer = func(
        &interner,
        0,
        "outer",
        vec![],
        Ty::Unit,
        Some(vec![Stmt::Expr(Expr::Closure(closure))]),
    );
    let module = lower(&interner, UnitKind::Library, vec![Decl::Func(outer)]);

    let closure = module
        .function(Constant::primary(DeclId::new(1)))
        .unwrap_or_else(|| panic!("closure not emitted"));
    assert_eq!(interner.lookup(closure.name), "closure#1");
    assert_eq!(
        closure.blocks[0].terminator,
        Some(Terminator::Unreachable)
    );
}

#[test]
fn verbose_mode_does_not_change_output() {
    let interner = StringInterner::new();
    let unit = TranslationUnit {
        kind: UnitKind::Executable,
        decls: point_program(&interner),
    };
    let quiet = construct_module(&unit, &interner, LowerOptions::default())
        .unwrap_or_else(|e| panic!("{e}"));
    let verbose = construct_module(&unit, &interner, LowerOptions::default().with_verbose(true))
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(quiet.functions, verbose.functions);
    assert_eq!(quiet.toplevel, verbose.toplevel);
    assert_eq!(quiet.layouts, verbose.layouts);
}
