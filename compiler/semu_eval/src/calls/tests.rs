use super::*;
use pretty_assertions::assert_eq;
use semu_ir::{keys, FunctionTable, InstructionRecord, VariableRef};

fn load(name: &str, kind: ProgramKind, records: &[InstructionRecord]) -> Program {
    match Program::load(ProgramHeader::new(name, kind), records) {
        Ok(program) => program,
        Err(err) => panic!("load failed: {err}"),
    }
}

/// Successor: 5 cycles.
fn successor() -> Program {
    load(
        "Successor",
        ProgramKind::Function,
        &[
            InstructionRecord::new("ASSIGNMENT", "y").with_argument(keys::ASSIGNED_VARIABLE, "x1"),
            InstructionRecord::new("INCREASE", "y"),
        ],
    )
}

/// Plus with an explicit `EXIT` and a nested call in its own body.
fn plus() -> Program {
    load(
        "Plus",
        ProgramKind::Function,
        &[
            InstructionRecord::new("ASSIGNMENT", "y").with_argument(keys::ASSIGNED_VARIABLE, "x1"),
            InstructionRecord::new("ASSIGNMENT", "z1").with_argument(keys::ASSIGNED_VARIABLE, "x2"),
            InstructionRecord::new("JUMP_ZERO", "z1")
                .with_label("L1")
                .with_argument(keys::JZ_LABEL, "EXIT"),
            InstructionRecord::new("QUOTE", "y")
                .with_argument(keys::FUNCTION_NAME, "Successor")
                .with_argument(keys::FUNCTION_ARGUMENTS, "y"),
            InstructionRecord::new("DECREASE", "z1"),
            InstructionRecord::new("GOTO_LABEL", "").with_argument(keys::GOTO_LABEL, "L1"),
        ],
    )
}

fn functions() -> SharedResolver {
    let table: FunctionTable = [successor(), plus()].into_iter().collect();
    Arc::new(table)
}

fn call(function: &str, args: &str) -> FunctionCall {
    match FunctionCall::parse(function, args) {
        Ok(call) => call,
        Err(err) => panic!("bad call: {err}"),
    }
}

fn context(inputs: &[i64]) -> ExecutionContext {
    ExecutionContext::seeded(inputs)
}

#[test]
fn interprets_simple_call() {
    let evaluator = CallEvaluator::new(functions());
    assert_eq!(
        evaluator.evaluate(&call("Successor", "x1"), &context(&[4]), 0),
        Ok(CallOutcome {
            value: 5,
            cycles: 5
        })
    );
}

#[test]
fn nested_argument_cycles_are_added_without_base_cost() {
    let evaluator = CallEvaluator::new(functions());
    assert_eq!(
        evaluator.evaluate(&call("Successor", "(Successor,x1)"), &context(&[4]), 0),
        Ok(CallOutcome {
            value: 6,
            cycles: 10
        })
    );
}

#[test]
fn missing_arguments_read_zero() {
    let evaluator = CallEvaluator::new(functions());
    let outcome = evaluator.evaluate(&call("Plus", "x1"), &context(&[3]), 0);
    assert_eq!(outcome.map(|o| o.value), Ok(3));
}

#[test]
fn strategies_agree_on_value_and_cycles() {
    let interpret = CallEvaluator::new(functions());
    let inline = CallEvaluator::new(functions()).strategy(CallStrategy::Inline);
    for (args, inputs) in [
        ("x1,x2", vec![3, 4]),
        ("x1,(Successor,x2)", vec![0, 2]),
        ("(Plus,x1,x1),(Successor,(Successor,x2))", vec![2, 1]),
        ("x2", vec![9, 0]),
    ] {
        let call = call("Plus", args);
        let ctx = context(&inputs);
        let a = interpret.evaluate(&call, &ctx, 0);
        let b = inline.evaluate(&call, &ctx, 0);
        assert!(a.is_ok(), "{args}: {a:?}");
        assert_eq!(a, b, "{args}");
    }
}

#[test]
fn plus_adds() {
    let evaluator = CallEvaluator::new(functions());
    let outcome = evaluator.evaluate(&call("Plus", "x1,x2"), &context(&[3, 4]), 0);
    assert_eq!(outcome.map(|o| o.value), Ok(7));
}

#[test]
fn unknown_function_under_both_strategies() {
    for strategy in [CallStrategy::Interpret, CallStrategy::Inline] {
        let evaluator = CallEvaluator::new(functions()).strategy(strategy);
        assert_eq!(
            evaluator.evaluate(&call("Times", "x1"), &context(&[1]), 0),
            Err(ExecError::UnknownFunction {
                function: "Times".to_owned()
            }),
            "{strategy:?}"
        );
    }
}

#[test]
fn depth_limit_is_enforced() {
    let evaluator = CallEvaluator::new(functions()).max_depth(2);
    assert!(evaluator
        .evaluate(&call("Successor", "x1"), &context(&[1]), 0)
        .is_ok());
    assert_eq!(
        evaluator.evaluate(&call("Successor", "(Successor,(Successor,x1))"), &context(&[1]), 0),
        Err(ExecError::CallDepthExceeded {
            function: "Successor".to_owned(),
            limit: 2,
        })
    );
}

#[test]
fn quote_instruction_charges_base_plus_call() {
    let main = load(
        "main",
        ProgramKind::Main,
        &[InstructionRecord::new("QUOTE", "y")
            .with_argument(keys::FUNCTION_NAME, "Successor")
            .with_argument(keys::FUNCTION_ARGUMENTS, "x1")],
    );
    let mut machine = Machine::new(Arc::new(main), &[4], CallEvaluator::new(functions()));
    assert_eq!(machine.run_to_end(), Ok(()));
    assert_eq!(machine.context().result(), 5);
    assert_eq!(machine.cycles(), 10);
}

#[test]
fn jump_equal_function_compares_result() {
    let main = load(
        "main",
        ProgramKind::Main,
        &[
            InstructionRecord::new("JUMP_EQUAL_FUNCTION", "x1")
                .with_argument(keys::FUNCTION_NAME, "Successor")
                .with_argument(keys::FUNCTION_ARGUMENTS, "x2")
                .with_argument(keys::JE_FUNCTION_LABEL, "EXIT"),
            InstructionRecord::new("INCREASE", "y"),
        ],
    );
    let main = Arc::new(main);
    let mut equal = Machine::new(Arc::clone(&main), &[3, 2], CallEvaluator::new(functions()));
    let mut differ = Machine::new(main, &[3, 3], CallEvaluator::new(functions()));
    assert_eq!(equal.run_to_end(), Ok(()));
    assert_eq!(differ.run_to_end(), Ok(()));
    assert_eq!(equal.context().result(), 0);
    assert_eq!(equal.cycles(), 6 + 5);
    assert_eq!(differ.context().result(), 1);
    assert_eq!(
        differ.context().get(VariableRef::input(1)),
        3,
        "comparison must not write the target"
    );
}
