use super::*;
use crate::{RegistryError, RunState};
use pretty_assertions::assert_eq;
use semu_eval::{CallStrategy, CreditError, InMemoryCredits};
use semu_expand::ExpandError;
use semu_ir::{keys, InstructionRecord, VariableRef};

fn successor() -> ProgramDefinition {
    ProgramDefinition::new(
        "Successor",
        vec![
            InstructionRecord::new("ASSIGNMENT", "y").with_argument(keys::ASSIGNED_VARIABLE, "x1"),
            InstructionRecord::new("INCREASE", "y"),
        ],
    )
}

/// `y <- x1 + 1` through a call: 5 + 5 cycles, architecture IV.
fn add_one() -> LoadUnit {
    LoadUnit {
        main: ProgramDefinition::new(
            "AddOne",
            vec![InstructionRecord::new("QUOTE", "y")
                .with_argument(keys::FUNCTION_NAME, "Successor")
                .with_argument(keys::FUNCTION_ARGUMENTS, "x1")],
        )
        .with_display_name("Add one"),
        functions: vec![successor()],
    }
}

/// Three increments of `y`: 3 cycles, architecture I.
fn count() -> ProgramDefinition {
    ProgramDefinition::new("Count", vec![InstructionRecord::new("INCREASE", "y"); 3])
}

/// `y <- x1`: architecture III at degree 0, basic at degree 2.
fn copy() -> ProgramDefinition {
    ProgramDefinition::new(
        "Copy",
        vec![InstructionRecord::new("ASSIGNMENT", "y").with_argument(keys::ASSIGNED_VARIABLE, "x1")],
    )
}

fn spin() -> ProgramDefinition {
    ProgramDefinition::new(
        "Spin",
        vec![
            InstructionRecord::new("INCREASE", "y").with_label("L1"),
            InstructionRecord::new("GOTO_LABEL", "").with_argument(keys::GOTO_LABEL, "L1"),
        ],
    )
}

fn engine_with(ledger: Arc<InMemoryCredits>) -> EngineHandle {
    let engine = EngineHandle::default().with_ledger(ledger);
    populate(&engine);
    engine
}

fn engine() -> EngineHandle {
    let engine = EngineHandle::default();
    populate(&engine);
    engine
}

fn populate(engine: &EngineHandle) {
    let results = [
        engine.register_unit(&add_one()),
        engine.add_main_program(&count()),
        engine.add_main_program(&copy()),
        engine.add_main_program(&spin()),
    ];
    for result in results {
        if let Err(err) = result {
            panic!("registration failed: {err}");
        }
    }
}

fn ok<T>(result: Result<T, EngineError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("engine call failed: {err}"),
    }
}

#[test]
fn executes_with_calls() {
    let engine = engine();
    let response = ok(engine.execute("ada", &ExecutionRequest::new("add one", 0, vec![4])));
    assert_eq!(
        response,
        ExecutionResponse {
            result: 5,
            total_cycles: 10,
            variables_sorted: vec![(VariableRef::RESULT, 5), (VariableRef::input(1), 4)],
            degree: 0,
            architecture: Architecture::IV,
            run_number: 1,
        }
    );

    let again = ok(engine.execute(
        "ada",
        &ExecutionRequest::new("AddOne", 0, vec![4]).with_strategy(CallStrategy::Inline),
    ));
    assert_eq!(again.run_number, 2);
    assert_eq!((again.result, again.total_cycles), (5, 10));
    assert_eq!(engine.runs("ada").len(), 2);
    assert!(engine.runs("bob").is_empty());
}

#[test]
fn every_degree_gives_the_same_result() {
    let engine = engine();
    let max = ok(engine.max_degree("AddOne"));
    assert!(max >= 2);
    for degree in 0..=max {
        let response = ok(engine.execute("ada", &ExecutionRequest::new("AddOne", degree, vec![6])));
        assert_eq!(response.result, 7, "degree {degree}");
    }
}

#[test]
fn charges_architecture_fee_and_cycles() {
    let ledger = Arc::new(InMemoryCredits::new());
    ledger.deposit("ada", 20);
    let engine = engine_with(Arc::clone(&ledger));

    let response = ok(engine.execute("ada", &ExecutionRequest::new("Count", 0, Vec::new())));
    assert_eq!(response.architecture, Architecture::I);
    assert_eq!(ledger.balance("ada"), Some(20 - 5 - 3));

    let explicit = ExecutionRequest::new("Count", 0, Vec::new()).with_architecture(Architecture::II);
    assert_eq!(
        engine.execute("ada", &explicit),
        Err(EngineError::Exec(ExecError::Credits(CreditError::Insufficient {
            user: "ada".to_owned(),
            requested: 100,
            available: 12,
        })))
    );
    assert_eq!(ledger.balance("ada"), Some(12));
}

#[test]
fn credits_can_run_out_mid_run() {
    let ledger = Arc::new(InMemoryCredits::new());
    ledger.deposit("bob", 6);
    let engine = engine_with(Arc::clone(&ledger));
    assert_eq!(
        engine.execute("bob", &ExecutionRequest::new("Count", 0, Vec::new())),
        Err(EngineError::Exec(ExecError::Credits(CreditError::Insufficient {
            user: "bob".to_owned(),
            requested: 1,
            available: 0,
        })))
    );
    assert!(engine.runs("bob").is_empty());
}

#[test]
fn weak_architecture_is_rejected() {
    let engine = engine();
    let request = ExecutionRequest::new("Copy", 0, vec![3]).with_architecture(Architecture::I);
    assert_eq!(
        engine.execute("ada", &request),
        Err(EngineError::UnsupportedArchitecture {
            architecture: Architecture::I,
            required: Architecture::III,
        })
    );

    let basic = ExecutionRequest::new("Copy", 2, vec![3]).with_architecture(Architecture::I);
    let response = ok(engine.execute("ada", &basic));
    assert_eq!(response.result, 3);
    assert_eq!(response.architecture, Architecture::I);
}

#[test]
fn configured_architecture_applies_when_request_names_none() {
    let engine = EngineHandle::new(EngineConfig::new().default_architecture(Architecture::IV));
    populate(&engine);
    let response = ok(engine.execute("ada", &ExecutionRequest::new("Count", 0, Vec::new())));
    assert_eq!(response.architecture, Architecture::IV);
}

#[test]
fn degree_queries() {
    let engine = engine();
    assert_eq!(engine.cached_max_degree("Copy"), Ok(0));
    assert_eq!(engine.max_degree("Copy"), Ok(2));
    assert_eq!(engine.cached_max_degree("copy"), Ok(2));
    assert_eq!(engine.max_degree("Count"), Ok(0));
    assert_eq!(
        engine.execute("ada", &ExecutionRequest::new("Count", 1, Vec::new())),
        Err(EngineError::Expand(ExpandError::DegreeOutOfRange {
            requested: 1,
            max: 0
        }))
    );

    let summary = ok(engine.summary("Copy", 0));
    assert_eq!(summary.synthetic_count, 1);
    assert_eq!(summary.minimal_architecture, Architecture::III);
}

#[test]
fn unknown_program_is_not_found() {
    let engine = engine();
    let missing = EngineError::ProgramNotFound {
        name: "Nope".to_owned(),
    };
    assert_eq!(
        engine.execute("ada", &ExecutionRequest::new("Nope", 0, Vec::new())),
        Err(missing.clone())
    );
    assert_eq!(engine.max_degree("Nope"), Err(missing.clone()));
    assert_eq!(
        engine.debug_initialize("ada", &DebugInit::new("Nope", 0, Vec::new())),
        Err(missing)
    );
}

#[test]
fn duplicate_registration_is_reported() {
    let engine = engine();
    assert_eq!(
        engine.add_main_program(&count()),
        Err(EngineError::Registry(RegistryError::DuplicateMainProgram {
            name: "Count".to_owned()
        }))
    );
}

#[test]
fn debug_session_flow() {
    let ledger = Arc::new(InMemoryCredits::new());
    ledger.deposit("ada", 100);
    let engine = engine_with(Arc::clone(&ledger));

    let pristine = ok(engine.debug_initialize("ada", &DebugInit::new("Count", 0, Vec::new())));
    assert_eq!(pristine.next_instruction_index, Some(0));
    assert_eq!(ledger.balance("ada"), Some(95));
    assert_eq!(engine.debug_state("ada", "count"), Ok(DebugState::NotStarted));

    ok(engine.debug_step_over("ada", "Count"));
    let second = ok(engine.debug_step_over("ada", "Count"));
    assert_eq!(second.result, 2);
    assert_eq!(ledger.balance("ada"), Some(93));

    let back = ok(engine.debug_step_back("ada", "Count"));
    assert_eq!(back.result, 1);
    assert_eq!(ledger.balance("ada"), Some(94));

    let end = ok(engine.debug_resume("ada", "Count", &[]));
    assert_eq!((end.result, end.has_more), (3, false));
    assert_eq!(ledger.balance("ada"), Some(92));
    assert_eq!(engine.debug_state("ada", "Count"), Ok(DebugState::Finished));

    let stopped = ok(engine.debug_stop("ada", "Count"));
    assert_eq!(stopped, end);
    let runs = engine.runs("ada");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].kind, RunKind::Debug);
    assert_eq!((runs[0].result, runs[0].total_cycles), (3, 3));

    assert_eq!(
        engine.debug_step_over("ada", "Count"),
        Err(EngineError::SessionNotFound {
            user: "ada".to_owned(),
            program: "Count".to_owned(),
        })
    );
}

#[test]
fn resume_stops_at_flagged_instruction() {
    let engine = engine();
    ok(engine.debug_initialize("ada", &DebugInit::new("Count", 0, Vec::new())));
    let hit = ok(engine.debug_resume("ada", "Count", &[false, false, true]));
    assert_eq!(hit.next_instruction_index, Some(2));
    assert_eq!(hit.result, 2);
    assert_eq!(engine.debug_state("ada", "Count"), Ok(DebugState::AtBreakpoint));
}

#[test]
fn reinitialize_replaces_the_session() {
    let engine = engine();
    ok(engine.debug_initialize("ada", &DebugInit::new("Count", 0, Vec::new())));
    ok(engine.debug_step_over("ada", "Count"));
    ok(engine.debug_step_over("ada", "Count"));

    let pristine = ok(engine.debug_initialize("ada", &DebugInit::new("count", 0, Vec::new())));
    assert_eq!(pristine.cycles_so_far, 0);
    let first = ok(engine.debug_step_over("ada", "Count"));
    assert_eq!(first.current_instruction_index, Some(0));
    assert_eq!(first.result, 1);
}

#[test]
fn sessions_are_per_user() {
    let engine = engine();
    ok(engine.debug_initialize("ada", &DebugInit::new("Count", 0, Vec::new())));
    ok(engine.debug_initialize("bob", &DebugInit::new("Count", 0, Vec::new())));
    ok(engine.debug_step_over("ada", "Count"));
    ok(engine.debug_step_over("ada", "Count"));

    let bob = ok(engine.debug_step_over("bob", "Count"));
    assert_eq!(bob.result, 1);
    assert!(matches!(
        engine.debug_step_over("eve", "Count"),
        Err(EngineError::SessionNotFound { .. })
    ));
}

#[test]
fn cancel_without_running_resume_is_ignored() {
    let engine = engine();
    ok(engine.debug_initialize("ada", &DebugInit::new("Count", 0, Vec::new())));
    ok(engine.debug_step_over("ada", "Count"));
    assert_eq!(engine.debug_cancel("ada", "Count"), Ok(()));

    let end = ok(engine.debug_resume("ada", "Count", &[]));
    assert_eq!(end.result, 3);
    assert_eq!(ok(engine.debug_state("ada", "Count")), DebugState::Finished);
}

#[test]
fn cancel_reaches_a_running_resume() {
    let engine = engine();
    ok(engine.debug_initialize("ada", &DebugInit::new("Spin", 0, Vec::new())));
    std::thread::scope(|scope| {
        let resumer = scope.spawn(|| engine.debug_resume("ada", "Spin", &[]));
        // Keep cancelling until the resume has observed it.
        while !resumer.is_finished() {
            let _ = engine.debug_cancel("ada", "Spin");
            std::thread::yield_now();
        }
        let outcome = resumer.join();
        assert!(matches!(
            outcome,
            Ok(Err(EngineError::Exec(ExecError::Interrupted { .. })))
        ));
    });
    assert!(matches!(engine.debug_step_over("ada", "Spin"), Ok(_)));

    // Cancels that raced past the interruption are gone: the next resume
    // runs until it hits its breakpoint.
    let at_breakpoint = engine.debug_resume("ada", "Spin", &[true]);
    assert!(matches!(at_breakpoint, Ok(ref s) if s.next_instruction_index == Some(0)));
    assert_eq!(ok(engine.debug_state("ada", "Spin")), DebugState::AtBreakpoint);
}

#[test]
fn submitted_run_completes() {
    let engine = engine();
    let task = engine.submit_run("ada", ExecutionRequest::new("AddOne", 1, vec![2]));
    let response = task.wait();
    assert_eq!(response.as_ref().map(|r| r.result), Ok(3));
    assert!(matches!(task.status(), RunState::Done(_)));
    assert_eq!(engine.runs("ada").len(), 1);
}

#[test]
fn submitted_run_can_be_cancelled() {
    let engine = engine();
    let task = engine.submit_run("ada", ExecutionRequest::new("Spin", 0, Vec::new()));
    task.cancel();
    assert_eq!(task.wait(), Err(EngineError::Exec(ExecError::Cancelled)));
    assert_eq!(
        task.status(),
        RunState::Failed(EngineError::Exec(ExecError::Cancelled))
    );
    assert!(engine.runs("ada").is_empty());
}
