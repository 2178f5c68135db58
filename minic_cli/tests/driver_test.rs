//! End-to-end driver tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn write_source(dir: &Path, name: &str, source: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, source).expect("write test source");
    path.to_string_lossy().into_owned()
}

fn minic() -> Command {
    Command::new(env!("CARGO_BIN_EXE_minic"))
}

#[test]
fn compiles_minimal_main_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "main.mc", "int main(){return 42;}");
    let output = minic().arg(&input).output().expect("run minic");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(".globl main"));
    assert!(stdout.contains("movl $42, %eax"));
    assert!(stdout.contains("leave"));
}

#[test]
fn writes_output_file_with_dash_o() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "main.mc", "int main(){return 0;}");
    let out_path = dir.path().join("out.s");
    let output = minic().arg(&input).arg("-o").arg(&out_path).output().expect("run minic");
    assert!(output.status.success());
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.contains(".text"));
    assert!(output.stdout.is_empty());
}

#[test]
fn semantic_failure_prints_one_diagnostic_and_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "bad.mc", "int main(){int a; a = true; return 0;}");
    let out_path = dir.path().join("out.s");
    let output = minic().arg(&input).arg("-o").arg(&out_path).output().expect("run minic");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let lines: Vec<_> = stderr.lines().collect();
    assert_eq!(lines.len(), 1, "exactly one diagnostic line: {:?}", lines);
    assert!(
        lines[0].ends_with("1:19: implicit type conversion of variable 'a'."),
        "got: {}",
        lines[0]
    );
    assert!(!out_path.exists(), "no partial output file on failure");
}

#[test]
fn missing_input_file_is_an_input_error() {
    let output = minic().arg("does-not-exist.mc").output().expect("run minic");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("does-not-exist.mc"));
}

#[test]
fn parse_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "bad.mc", "int main(){return 42}");
    let output = minic().arg(&input).output().expect("run minic");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("bad.mc:1:21:"), "got: {}", stderr);
}

#[test]
fn reads_program_from_stdin() {
    let mut child = minic()
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn minic");
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"int main(){return 7;}")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for minic");
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("movl $7, %eax"));
}

#[test]
fn multiple_inputs_concatenate_in_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let helper = write_source(dir.path(), "helper.mc", "int one(){return 1;}");
    let main = write_source(dir.path(), "main.mc", "int main(){return one();}");
    let output = minic().arg(&helper).arg(&main).output().expect("run minic");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let one = stdout.find("\none:").expect("helper function emitted");
    let main_label = stdout.find("\nmain:").expect("main emitted");
    assert!(one < main_label, "argument order is preserved");
}

#[test]
fn help_exits_zero() {
    let output = minic().arg("--help").output().expect("run minic");
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("Usage"));
}

#[test]
fn ir_printer_emits_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "main.mc", "int main(){int a; a = 1; return a;}");
    let output = Command::new(env!("CARGO_BIN_EXE_minic_ir"))
        .arg(&input)
        .output()
        .expect("run minic_ir");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("| line no.  | instruction"));
    assert!(stdout.contains("func_label"));
}

#[test]
fn ir_printer_limits_to_a_function() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(
        dir.path(),
        "main.mc",
        "int f(){return 1;} int main(){return f();}",
    );
    let output = Command::new(env!("CARGO_BIN_EXE_minic_ir"))
        .arg("-f")
        .arg("f")
        .arg(&input)
        .output()
        .expect("run minic_ir");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("call"), "main's rows are excluded: {}", stdout);
}

#[test]
fn ast_printer_emits_dot() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "main.mc", "int main(){return 1 + 2;}");
    let output = Command::new(env!("CARGO_BIN_EXE_minic_ast_to_dot"))
        .arg(&input)
        .output()
        .expect("run minic_ast_to_dot");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("digraph \"AST\" {"));
    assert!(stdout.contains("expr: +"));
}

#[test]
fn symbol_table_printer_has_text_and_dot_modes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(dir.path(), "main.mc", "int main(){int a; return a;}");
    let text = Command::new(env!("CARGO_BIN_EXE_minic_symbol_table"))
        .arg(&input)
        .output()
        .expect("run minic_symbol_table");
    assert!(text.status.success());
    assert!(String::from_utf8(text.stdout).unwrap().contains("a (int)"));

    let dot = Command::new(env!("CARGO_BIN_EXE_minic_symbol_table"))
        .arg("--dot")
        .arg(&input)
        .output()
        .expect("run minic_symbol_table --dot");
    assert!(dot.status.success());
    assert!(String::from_utf8(dot.stdout).unwrap().contains("<table"));
}

#[test]
fn cfg_printer_emits_record_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(
        dir.path(),
        "main.mc",
        "int main(){int a; a = 0; while(a < 3){a = a + 1;} return a;}",
    );
    let output = Command::new(env!("CARGO_BIN_EXE_minic_cfg_to_dot"))
        .arg(&input)
        .output()
        .expect("run minic_cfg_to_dot");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("digraph A {"));
    assert!(stdout.contains("shape=record"));
    assert!(stdout.contains("->"));
}

#[test]
fn compiles_array_arguments_by_reference() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(
        dir.path(),
        "main.mc",
        "int sum(int[2] a){return a[0] + a[1];} \
         int main(){int[2] b; b[0] = 1; b[1] = 2; return sum(b);}",
    );
    let output = minic().arg(&input).output().expect("run minic");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("\tleal"), "caller pushes the array address: {}", stdout);
    assert!(stdout.contains("%ecx"), "callee reads through the pointer: {}", stdout);
}

#[test]
fn runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(
        dir.path(),
        "main.mc",
        "int main(){print(\"hi\"); print_nl(); int a; a = read_int(); return a;}",
    );
    let first = minic().arg(&input).output().expect("run minic");
    let second = minic().arg(&input).output().expect("run minic");
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}
