use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const PRODUCTS: &str = r#"<html><body>
<div class="product"><h2>Lamp</h2><span class="price"> 12 </span><i class="tag">home</i><i class="tag">light</i></div>
<div class="product"><h2>Desk</h2><i class="tag">office</i></div>
</body></html>"#;

#[test]
fn echo_document_without_query() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.write_stdin("<p>hi</p>");

    cmd.assert()
        .success()
        .stdout("<html><head></head><body><p>hi</p></body></html>\n");
}

#[test]
fn extract_text_with_css_and_xpath() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg(".product").arg("h2/text()").write_stdin(PRODUCTS);

    cmd.assert().success().stdout("Lamp\nDesk\n");
}

#[test]
fn extract_attributes() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("a")
        .arg("@href")
        .write_stdin(r#"<a href="/one">1</a><a href="/two">2</a><a>3</a>"#);

    cmd.assert().success().stdout("/one\n/two\n");
}

#[test]
fn object_records() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.args([
        ".product",
        "name:",
        "h2/text()",
        "price:",
        ".price",
        "text()",
        "tags::",
        ".tag",
        "text()",
    ])
    .write_stdin(PRODUCTS);

    cmd.assert().success().stdout(
        "{\"name\":\"Lamp\",\"price\":\"12\",\"tags\":[\"home\",\"light\"]}\n\
         {\"name\":\"Desk\",\"price\":null,\"tags\":[\"office\"]}\n",
    );
}

#[test]
fn json_scalars() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("--json").arg("//h2").write_stdin(PRODUCTS);

    cmd.assert()
        .success()
        .stdout("\"<h2>Lamp</h2>\"\n\"<h2>Desk</h2>\"\n");
}

#[test]
fn pretty_markup() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("-p").arg("//ul").write_stdin("<ul><li>a</li><li>b</li></ul>");

    cmd.assert()
        .success()
        .stdout("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
}

#[test]
fn per_line_documents() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("-l")
        .arg("count(//li)")
        .write_stdin("<li>a</li><li>b</li>\n\n<li>c</li>\n");

    cmd.assert().success().stdout("2\n1\n");
}

#[test]
fn per_line_parse_error_goes_to_stderr() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("--lines")
        .arg("//p/text()")
        .write_stdin(&b"<p>one</p>\n<p>\xff</p>\n<p>two</p>\n"[..]);

    cmd.assert()
        .success()
        .stdout("one\ntwo\n")
        .stderr(predicate::str::starts_with("Err: "));
}

#[test]
fn invalid_selector_is_reported() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("//p[").write_stdin("<p>x</p>");

    cmd.assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("xpath '//p[': "));
}

#[test]
fn untranslatable_css_is_reported_as_xpath() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("p[").write_stdin("<p>x</p>");

    cmd.assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("xpath 'p[': "));
}

#[test]
fn absolute_field_paths_stay_in_their_record() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.args([".product", "name:", "//h2/text()"]).write_stdin(PRODUCTS);

    cmd.assert()
        .success()
        .stdout("{\"name\":\"Lamp\"}\n{\"name\":\"Desk\"}\n");
}

#[test]
fn json_lines_passthrough() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.args(["--jsonl", "html", "title:", "//title/text()"])
        .write_stdin(
            "{\"url\": \"a\", \"html\": \"<title>A</title>\"}\n\
             {\"url\": \"b\"}\n\
             {\"url\": \"c\", \"html\": \"<title>C</title>\", \"n\": 3}\n",
        );

    cmd.assert().success().stdout(
        "{\"title\":\"A\",\"_\":{\"url\":\"a\"}}\n\
         {\"title\":\"C\",\"_\":{\"url\":\"c\",\"n\":3}}\n",
    );
}

#[test]
fn malformed_json_line_exits_3() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.args(["--jsonl", "html", "t:", "//p/text()"])
        .write_stdin("{\"html\": \"<p>a</p>\"}\nnot json\n");

    cmd.assert()
        .code(3)
        .stdout("{\"t\":\"a\"}\n")
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn non_object_json_line_exits_4() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.args(["--jsonl", "html", "t:", "//p"]).write_stdin("\"<p>a</p>\"\n");

    cmd.assert().code(4);
}

#[test]
fn lines_conflicts_with_jsonl() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.args(["-l", "--jsonl", "html"]).write_stdin("");

    cmd.assert().code(2);
}

#[test]
fn help_describes_query_syntax() {
    let mut cmd = cargo_bin_cmd!("htqq");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("QUERY SYNTAX").and(predicate::str::contains("name::")));
}
