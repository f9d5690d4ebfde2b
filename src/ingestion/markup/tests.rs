use super::*;

#[test]
fn markdown_markup_is_removed() {
    let markdown = "# Hostel Rules\n\nGates close at **22:00** sharp.\nVisitors sign in at the `front desk`.\n\n- Quiet hours start at 23:00.\n- No cooking in rooms.\n";

    let text = markdown_to_text(markdown);

    assert_eq!(
        text,
        "Hostel Rules\nGates close at 22:00 sharp. Visitors sign in at the front desk.\nQuiet hours start at 23:00.\nNo cooking in rooms."
    );
}

#[test]
fn markdown_links_keep_their_text() {
    let text = markdown_to_text("Pay online via the [fee portal](https://fees.example.edu).");
    assert_eq!(text, "Pay online via the fee portal.");
}

#[test]
fn markdown_inline_html_is_dropped() {
    let text = markdown_to_text("Deadline <span>soon</span>.");
    assert!(!text.contains("<span>"));
    assert!(text.contains("Deadline"));
}

#[test]
fn empty_markdown() {
    assert_eq!(markdown_to_text(""), "");
}

#[test]
fn html_visible_text_only() {
    let html = r#"
        <!DOCTYPE html>
        <html>
          <head><title>Notices</title><style>p { color: red; }</style></head>
          <body>
            <h1>Exam Notice</h1>
            <p>Mid-term exams begin on <b>3 March</b>.</p>
            <script>console.log("hidden");</script>
            <p>Hall tickets are issued a week earlier.</p>
          </body>
        </html>
    "#;

    let text = html_to_text(html);

    assert_eq!(
        text,
        "Exam Notice\nMid-term exams begin on 3 March.\nHall tickets are issued a week earlier."
    );
}

#[test]
fn html_blocks_without_whitespace_stay_separate() {
    let text = html_to_text("<div>First block.</div><div>Second block.</div>");
    assert_eq!(text, "First block.\nSecond block.");
}

#[test]
fn html_entities_are_decoded() {
    let text = html_to_text("<p>Fees &amp; scholarships</p>");
    assert_eq!(text, "Fees & scholarships");
}
