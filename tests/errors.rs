use bumpalo::Bump;
use miette::Diagnostic;
use mypl::{AstBuilder, BinaryOp, Error, ExecutionOptions, Program, RuntimeErrorKind};
use pretty_assertions::assert_eq;

fn run(program: &Program<'_>, options: ExecutionOptions) -> Error {
    let mut output = Vec::new();
    mypl::run_with_io(program, options, std::io::empty(), &mut output).unwrap_err()
}

fn code_of(error: &Error) -> String {
    error.code().map(|code| code.to_string()).unwrap_or_default()
}

#[test]
fn division_by_zero_reports_its_location() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.function(
        "main",
        "void",
        &[],
        vec![b.call_stmt("print", &[b.binary(BinaryOp::Div, b.int(1), b.int(0))])],
    );

    let error = run(b.program(vec![], vec![main]), ExecutionOptions::default());

    assert!(matches!(
        &error,
        Error::Runtime(e) if e.kind == RuntimeErrorKind::DivisionByZero
    ));
    assert_eq!(error.to_string(), "Division by zero (in main at 2: div)");
    assert_eq!(code_of(&error), "mypl::runtime");

    let rendered = mypl::render_error_to_string(&error);
    assert!(rendered.contains("mypl::runtime"), "{rendered}");
    assert!(rendered.contains("Division by zero"), "{rendered}");
}

#[test]
fn failed_conversion_names_the_text() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.function(
        "main",
        "void",
        &[],
        vec![b.var_decl("n", b.call("stoi", &[b.string("abc")]))],
    );

    let error = run(b.program(vec![], vec![main]), ExecutionOptions::default());
    assert_eq!(
        error.to_string(),
        "Cannot convert \"abc\" to int (in main at 1: toint)"
    );
}

#[test]
fn stack_overflow_has_help_text() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.function("main", "void", &[], vec![b.call_stmt("main", &[])]);

    let error = run(b.program(vec![], vec![main]), ExecutionOptions { max_depth: 3 });

    assert_eq!(
        error.to_string(),
        "Call stack overflow: depth 4 exceeds maximum of 3"
    );
    assert_eq!(code_of(&error), "mypl::resource");
    assert!(error.help().is_some());

    let rendered = mypl::render_error_to_string(&error);
    assert!(rendered.contains("max_depth"), "{rendered}");
}

#[test]
fn compile_errors_have_their_own_code() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.function(
        "main",
        "void",
        &[],
        vec![b.call_stmt("print", &[b.var("ghost")])],
    );

    let error = run(b.program(vec![], vec![main]), ExecutionOptions::default());
    assert_eq!(
        error.to_string(),
        "Compilation failed: Undefined variable 'ghost'"
    );
    assert_eq!(code_of(&error), "mypl::compile");
}

#[test]
fn missing_main_is_an_entry_point_error() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);

    let error = run(b.program(vec![], vec![]), ExecutionOptions::default());
    assert_eq!(error.to_string(), "No function named 'main' is registered");
    assert_eq!(code_of(&error), "mypl::entry_point");
}
