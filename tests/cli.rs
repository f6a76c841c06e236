mod common;

use assert_cmd::Command;
use common::{TestWorkspace, sales_csv};
use predicates::prelude::*;

fn datasight() -> Command {
    Command::cargo_bin("datasight").expect("binary built")
}

#[test]
fn probe_prints_a_column_profile_table() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", &sales_csv());

    datasight()
        .args(["probe", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("column")
                .and(predicate::str::contains("Month"))
                .and(predicate::str::contains("numeric"))
                .and(predicate::str::contains("text")),
        );
}

#[test]
fn probe_honors_a_tab_delimiter() {
    let workspace = TestWorkspace::new();
    let tsv = sales_csv().replace(',', "\t");
    let input = workspace.write("sales.tsv", &tsv);

    datasight()
        .args(["probe", "--delimiter", "tab", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sales"));
}

#[test]
fn analyze_json_carries_summary_charts_and_sample_rows() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", &sales_csv());

    datasight()
        .args(["analyze", "--json", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"summary\"")
                .and(predicate::str::contains("\"charts\""))
                .and(predicate::str::contains("\"sample_rows\"")),
        );
}

#[test]
fn analyze_table_lists_each_proposed_chart() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", &sales_csv());

    datasight()
        .args(["analyze", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(" point(s)"));
}

#[test]
fn ask_answers_a_chart_question() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", &sales_csv());

    datasight()
        .args(["ask", "-q", "bar chart of Sales by Region", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("[bar]"));
}

#[test]
fn ask_prints_a_signed_ranking_table_for_correlation_questions() {
    let workspace = TestWorkspace::new();
    let mut csv = String::from("Sales,TV,Promo\n");
    for i in 1..=10 {
        csv.push_str(&format!("{i},{},{}\n", i * 2, -i));
    }
    let input = workspace.write("metrics.csv", &csv);

    datasight()
        .args(["ask", "-q", "what affects Sales?", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("variable")
                .and(predicate::str::contains("n_pairs"))
                .and(predicate::str::contains("+1.000"))
                .and(predicate::str::contains("-1.000")),
        );
}

#[test]
fn ask_json_serializes_the_full_answer() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", &sales_csv());

    datasight()
        .args(["ask", "--json", "-q", "what affects Sales?", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"answer\"").and(predicate::str::contains("\"charts\"")),
        );
}

#[test]
fn missing_input_fails_with_a_loader_error() {
    datasight()
        .args(["probe", "-i", "no-such-file.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
