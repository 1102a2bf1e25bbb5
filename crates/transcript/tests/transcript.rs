use pretty_assertions::assert_eq;
use transcript::{
    finalize_between_marks, has_pending_response, insert_placeholder, parse, replace_between_marks,
    Message, RequestAnchor, Role, RESPONSE_END, RESPONSE_START,
};

#[test]
fn terse_system_prompt_scenario_parses_in_source_order() {
    let transcript = parse("**SYSTEM**: Be terse\n**USER**: 2+2?");

    assert_eq!(
        transcript.messages,
        vec![Message::system("Be terse"), Message::user("2+2?")]
    );
    assert!(transcript.options.is_empty());
}

#[test]
fn one_message_per_role_switch_plus_leading_content() {
    let tagged = "**USER**: a\n**ASSISTANT**: b\n**USER**: c\n**ASSISTANT**: d";
    assert_eq!(parse(tagged).messages.len(), 4);

    let with_lead = format!("preamble\n{tagged}");
    let messages = parse(&with_lead).messages;
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0], Message::user("preamble"));

    for message in &messages {
        assert_eq!(message.content, message.content.trim());
        assert!(!message.content.is_empty());
    }
}

#[test]
fn commented_lines_never_reach_message_content() {
    let block = "**USER**: keep\n# drop this line\n  #**ASSISTANT**: also dropped\n**ASSISTANT**: ok";
    let transcript = parse(block);

    assert_eq!(
        transcript.messages,
        vec![Message::user("keep"), Message::assistant("ok")]
    );
    for message in &transcript.messages {
        assert!(!message.content.contains("drop this line"));
        assert!(!message.content.contains("also dropped"));
    }
}

#[test]
fn directive_lines_set_options_and_stay_out_of_content() {
    let block = "##temperature 0.7\n##top_p\n##max_tokens 128\n##presence_penalty -0.5\n**USER**: hi";
    let transcript = parse(block);

    assert_eq!(transcript.options.temperature, Some(0.7));
    assert_eq!(transcript.options.top_p, None);
    assert_eq!(transcript.options.max_tokens, Some(128));
    assert_eq!(transcript.options.presence_penalty, Some(-0.5));
    assert_eq!(transcript.messages, vec![Message::user("hi")]);
}

#[test]
fn bare_directive_leaves_option_unset() {
    assert_eq!(parse("##temperature").options.temperature, None);
}

#[test]
fn pending_trailing_answer_is_not_sent() {
    let anchor = RequestAnchor::generate();
    let block = insert_placeholder("**SYSTEM**: Be terse\n**USER**: 2+2?\n", Some(&anchor));
    let transcript = parse(&block);

    assert_eq!(
        transcript.messages,
        vec![Message::system("Be terse"), Message::user("2+2?")]
    );
    assert!(transcript
        .messages
        .iter()
        .all(|message| message.role != Role::Assistant));
}

#[test]
fn finalizing_placeholder_leaves_content_and_no_markers() {
    let anchor = RequestAnchor::generate();
    let text = insert_placeholder("**USER**: 2+2?", Some(&anchor));

    let finished = finalize_between_marks(&text, "4 and 6", Some(&anchor));

    assert_eq!(finished, "**USER**: 2+2?\n**ASSISTANT**: 4 and 6\n");
    assert!(!finished.contains(RESPONSE_START));
    assert!(!finished.contains(RESPONSE_END));
    assert!(!has_pending_response(&finished));
}

#[test]
fn finalizing_twice_is_a_no_op() {
    let text = insert_placeholder("**USER**: q", None);
    let once = finalize_between_marks(&text, "a", None);
    let twice = finalize_between_marks(&once, "a", None);
    assert_eq!(once, twice);
}

#[test]
fn replacement_without_markers_is_identity() {
    let text = "**USER**: nothing pending\n**ASSISTANT**: done";
    let anchor = RequestAnchor::generate();

    assert_eq!(replace_between_marks(text, "x", None), text);
    assert_eq!(replace_between_marks(text, "x", Some(&anchor)), text);
    assert_eq!(finalize_between_marks(text, "x", Some(&anchor)), text);

    let only_start = format!("{text}{RESPONSE_START}");
    assert_eq!(finalize_between_marks(&only_start, "x", None), only_start);
}

#[test]
fn finished_answer_becomes_history_on_next_parse() {
    let text = insert_placeholder("**USER**: 2+2?", None);
    let finished = finalize_between_marks(&text, "4", None);

    assert_eq!(
        parse(&finished).messages,
        vec![Message::user("2+2?"), Message::assistant("4")]
    );
}
