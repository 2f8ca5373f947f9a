use super::*;
use pretty_assertions::assert_eq;

fn var(text: &str) -> Argument {
    Argument::Variable(VariableRef::parse(text).unwrap_or(VariableRef::RESULT))
}

#[test]
fn parses_flat_variable_arguments() {
    let call = FunctionCall::parse("Plus", "x1,x2");
    assert_eq!(
        call,
        Ok(FunctionCall::new("Plus", vec![var("x1"), var("x2")]))
    );
}

#[test]
fn parses_nested_calls_and_nullary_calls() {
    let call = FunctionCall::parse("Minus", "x1,(Successor,(Const7)), z2");
    let expected = FunctionCall::new(
        "Minus",
        vec![
            var("x1"),
            Argument::Call(FunctionCall::new(
                "Successor",
                vec![Argument::Call(FunctionCall::new("Const7", vec![]))],
            )),
            var("z2"),
        ],
    );
    assert_eq!(call, Ok(expected));
}

#[test]
fn empty_argument_list_is_allowed() {
    assert_eq!(
        FunctionCall::parse("Const7", ""),
        Ok(FunctionCall::new("Const7", vec![]))
    );
}

#[test]
fn arguments_text_round_trips() {
    for text in ["", "x1", "x1,(Successor,x2),(Const7)", "(Plus,(Plus,x1,y),z3)"] {
        let call = FunctionCall::parse("F", text);
        assert_eq!(call.map(|c| c.arguments_text()), Ok(text.to_owned()));
    }
}

#[test]
fn display_wraps_name_and_arguments() {
    let call = FunctionCall::parse("Plus", "x1,(Const7)");
    assert_eq!(
        call.map(|c| c.to_string()),
        Ok("(Plus,x1,(Const7))".to_owned())
    );
}

#[test]
fn rejects_malformed_lists() {
    for text in ["x1,", "(Plus,x1", "x1)", "(,x1)", "x1,,x2", "q1"] {
        assert!(
            FunctionCall::parse("F", text).is_err(),
            "`{text}` should be rejected"
        );
    }
}

#[test]
fn rejects_empty_function_name() {
    assert!(matches!(
        FunctionCall::parse("  ", "x1"),
        Err(LoadError::MalformedArguments { .. })
    ));
}

#[test]
fn collects_variables_and_functions() {
    let Ok(call) = FunctionCall::parse("Minus", "x1,(Plus,z2,(Const7)),y") else {
        panic!("parse failed");
    };
    let mut vars = Vec::new();
    call.for_each_variable(&mut |v| vars.push(v));
    assert_eq!(
        vars,
        vec![VariableRef::input(1), VariableRef::work(2), VariableRef::RESULT]
    );

    let mut names = Vec::new();
    call.for_each_function(&mut |f| names.push(f.to_owned()));
    assert_eq!(names, vec!["Minus", "Plus", "Const7"]);
    assert_eq!(call.depth(), 3);
}

#[test]
fn map_variables_renames_nested_arguments() {
    let Ok(call) = FunctionCall::parse("Minus", "x1,(Plus,x1,x2)") else {
        panic!("parse failed");
    };
    let renamed = call.map_variables(&|v| {
        if v.is_input() {
            VariableRef::work(v.serial() + 10)
        } else {
            v
        }
    });
    assert_eq!(renamed.arguments_text(), "z11,(Plus,z11,z12)");
}
