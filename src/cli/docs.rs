//! Query syntax reference shown by `htqq --help`

/// Long-form help describing the query language
pub fn query_syntax() -> &'static str {
    r#"QUERY SYNTAX

  Query tokens form a pipeline. Tokens before the first stage marker are the
  initial stage, applied to the whole document; each of its selectors runs on
  the output of the previous one. Every node it selects becomes one record.

  name:             Start a field holding the first match (or null)
  name::            Start a field holding every match as a list
  //xpath, @attr    XPath, used as written
  css               CSS selectors are translated to XPath; anything that is
                    not CSS is used as XPath
  a | b             Alternatives, results concatenated in order

  Without field markers each record is printed as-is (text, or markup for
  element nodes). With field markers each record is one JSON object.

EXAMPLES

  Echo the document:
    htqq < page.html

  Link targets, one per line:
    htqq 'a' '@href' < page.html

  One JSON object per product:
    htqq '.product' name: 'h2/text()' price: .price 'text()' tags:: .tag 'text()' < page.html

  Titles from a JSON-lines crawl, keeping the other columns under "_":
    htqq --jsonl body title: '//title/text()' < crawl.jsonl

EXIT STATUS

  0 success, 1 failure, 2 bad arguments, 3 malformed JSON line,
  4 JSON line that is not an object, 130 interrupted read ("Interrupted" on
  stderr). Ctrl-C kills the process by SIGINT; the shell then reports 130.
"#
}
