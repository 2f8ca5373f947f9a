use super::*;
use crate::keys;
use pretty_assertions::assert_eq;

fn header(name: &str) -> ProgramHeader {
    ProgramHeader::new(name, ProgramKind::Main)
}

fn load(records: &[InstructionRecord]) -> Program {
    match Program::load(header("test"), records) {
        Ok(program) => program,
        Err(err) => panic!("load failed: {err}"),
    }
}

/// Moves x1 into y using basic instructions only.
fn copy_records() -> Vec<InstructionRecord> {
    vec![
        InstructionRecord::new("JUMP_NOT_ZERO", "x1")
            .with_label("L1")
            .with_argument(keys::JNZ_LABEL, "L2"),
        InstructionRecord::new("INCREASE", "z1"),
        InstructionRecord::new("JUMP_NOT_ZERO", "z1").with_argument(keys::JNZ_LABEL, "EXIT"),
        InstructionRecord::new("DECREASE", "x1").with_label("L2"),
        InstructionRecord::new("INCREASE", "y"),
        InstructionRecord::new("JUMP_NOT_ZERO", "x1").with_argument(keys::JNZ_LABEL, "L2"),
    ]
}

#[test]
fn load_numbers_instructions_and_assigns_ids() {
    let program = load(&copy_records());
    let numbers: Vec<_> = program.instructions().iter().map(|i| i.number).collect();
    let ids: Vec<_> = program.instructions().iter().map(|i| i.id.raw()).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(program.degree(), 0);
    assert!(program.instructions().iter().all(|i| i.origin.is_none()));
}

#[test]
fn indexes_labels_and_variables() {
    let program = load(&copy_records());
    assert_eq!(program.position_of(LabelRef::Numbered(1)), Some(0));
    assert_eq!(program.position_of(LabelRef::Numbered(2)), Some(3));
    assert_eq!(program.position_of(LabelRef::Numbered(3)), None);
    assert_eq!(
        program.variables(),
        vec![VariableRef::RESULT, VariableRef::input(1), VariableRef::work(1)]
    );
    assert_eq!(
        program.labels(),
        vec![LabelRef::Numbered(1), LabelRef::Numbered(2), LabelRef::Exit]
    );
    assert_eq!(program.arity(), 1);
}

#[test]
fn counters_start_past_used_names() {
    let program = load(&[
        InstructionRecord::new("INCREASE", "z4").with_label("L7"),
        InstructionRecord::new("QUOTE", "y")
            .with_argument(keys::FUNCTION_NAME, "Id")
            .with_argument(keys::FUNCTION_ARGUMENTS, "(Id,z9)"),
    ]);
    let mut names = program.names();
    assert_eq!(names.next_label_seq(), 8);
    assert_eq!(names.next_work_var_seq(), 10);
    assert_eq!(names.fresh_label(), Ok(LabelRef::Numbered(8)));
    assert_eq!(names.fresh_work(), Ok(VariableRef::work(10)));
    assert_eq!(names.fresh_work(), Ok(VariableRef::work(11)));
}

#[test]
fn highest_serials_leave_no_fresh_names() {
    let program = load(&[
        InstructionRecord::new("INCREASE", "z4294967295").with_label("L4294967295")
    ]);
    let mut names = program.names();
    assert_eq!(names.fresh_label(), Err(NamesExhausted::Labels));
    assert_eq!(names.fresh_work(), Err(NamesExhausted::WorkVariables));
}

#[test]
fn serial_below_the_limit_still_gets_the_last_name() {
    let program = load(&[
        InstructionRecord::new("INCREASE", "z4294967294").with_label("L4294967294")
    ]);
    let mut names = program.names();
    assert_eq!(names.fresh_label(), Ok(LabelRef::Numbered(u32::MAX)));
    assert_eq!(names.fresh_label(), Err(NamesExhausted::Labels));
    assert_eq!(names.fresh_work(), Ok(VariableRef::work(u32::MAX)));
    assert_eq!(names.fresh_work(), Err(NamesExhausted::WorkVariables));
}

#[test]
fn duplicate_label_is_rejected() {
    let result = Program::load(
        header("dup"),
        &[
            InstructionRecord::new("INCREASE", "x1").with_label("L1"),
            InstructionRecord::new("DECREASE", "x1").with_label("l1"),
        ],
    );
    assert_eq!(
        result.map(|p| p.len()),
        Err(LoadError::DuplicateLabel {
            program: "dup".to_owned(),
            label: LabelRef::Numbered(1),
        })
    );
}

#[test]
fn undefined_label_is_rejected_but_exit_is_fine() {
    let result = Program::load(
        header("undef"),
        &[
            InstructionRecord::new("JUMP_ZERO", "x1").with_argument(keys::JZ_LABEL, "EXIT"),
            InstructionRecord::new("GOTO_LABEL", "").with_argument(keys::GOTO_LABEL, "L5"),
        ],
    );
    assert_eq!(
        result.map(|p| p.len()),
        Err(LoadError::UndefinedLabel {
            program: "undef".to_owned(),
            label: LabelRef::Numbered(5),
            instruction: 2,
        })
    );
}

#[test]
fn empty_name_is_rejected() {
    assert!(matches!(
        Program::load(header("  "), &[]),
        Err(LoadError::EmptyName)
    ));
}

#[test]
fn empty_program_is_valid() {
    let program = load(&[]);
    assert!(program.is_empty());
    assert_eq!(program.variables(), vec![VariableRef::RESULT]);
    assert_eq!(program.minimal_architecture(), Architecture::I);
}

#[test]
fn summary_counts_kinds_and_architectures() {
    let program = load(&[
        InstructionRecord::new("ZERO_VARIABLE", "y"),
        InstructionRecord::new("INCREASE", "y"),
        InstructionRecord::new("ASSIGNMENT", "z1").with_argument(keys::ASSIGNED_VARIABLE, "x2"),
        InstructionRecord::new("JUMP_EQUAL_FUNCTION", "y")
            .with_argument(keys::FUNCTION_NAME, "Plus")
            .with_argument(keys::FUNCTION_ARGUMENTS, "x1,(Const7)")
            .with_argument(keys::JE_FUNCTION_LABEL, "EXIT"),
    ]);
    let summary = program.summary();
    assert_eq!(summary.instruction_count, 4);
    assert_eq!(summary.basic_count, 1);
    assert_eq!(summary.synthetic_count, 3);
    assert_eq!(summary.count_for(Architecture::I), 1);
    assert_eq!(summary.count_for(Architecture::II), 1);
    assert_eq!(summary.count_for(Architecture::III), 1);
    assert_eq!(summary.count_for(Architecture::IV), 1);
    assert_eq!(summary.minimal_architecture, Architecture::IV);
    assert_eq!(summary.functions, vec!["Const7", "Plus"]);
    assert_eq!(summary.labels, vec![LabelRef::Exit]);
    assert_eq!(
        summary.variables,
        vec![
            VariableRef::RESULT,
            VariableRef::input(1),
            VariableRef::input(2),
            VariableRef::work(1)
        ]
    );
}

#[test]
fn highlight_queries_report_instruction_numbers() {
    let program = load(&copy_records());
    assert_eq!(
        program.instructions_using_variable(VariableRef::input(1)),
        vec![1, 4, 6]
    );
    assert_eq!(
        program.instructions_using_label(LabelRef::Numbered(2)),
        vec![1, 4, 6]
    );
    assert_eq!(program.instructions_using_label(LabelRef::Exit), vec![3]);
}

#[test]
fn render_lists_every_instruction() {
    let program = load(&copy_records());
    let rendered = program.render();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "#1 (B) [ L1  ] IF x1 != 0 GOTO L2 (2)");
    assert_eq!(lines[1], "#2 (B) [     ] z1 <- z1 + 1 (1)");
    assert_eq!(lines[3], "#4 (B) [ L2  ] x1 <- x1 - 1 (1)");
}

#[test]
fn to_definition_round_trips_records() {
    let records = copy_records();
    let program = load(&records);
    let definition = program.to_definition();
    assert_eq!(definition.name, "test");
    assert_eq!(definition.instructions, records);
}
