use stimcompiler_backend::*;
use stimctrl_backend::EditorSession;

#[test]
fn editing_a_protocol_from_scratch() {
    let mut session = EditorSession::default();
    let block = session.first_stimulation();
    let leaf = session.add_child().unwrap();
    session.set_attribute_text("Duration", "1").unwrap();
    session.set_attribute_text("Pulses", "3").unwrap();
    session.set_attribute_text("Width", "0.1").unwrap();

    session.select(Some(block)).unwrap();
    session.set_attribute_text("Iterations", "2").unwrap();
    // Block attributes are refused on leaves
    session.select(Some(leaf)).unwrap();
    assert!(session.set_attribute_text("Iterations", "2").is_err());

    assert!(session.last_error().is_none());
    let preview = session.preview();
    // Short protocols are stretched to the preview budget by repeating points
    assert_eq!(preview.len(), PREVIEW_POINTS);
    assert_eq!(synthesize(&session.snapshot()).unwrap().len(), 600);
    let (start, end) = preview.span().unwrap();
    assert_eq!(start, 0.);
    assert!(end > 1.99 && end < 2.);
}

#[test]
fn failing_node_is_named_and_fixable() {
    let mut session = EditorSession::default();
    let first = session.first_stimulation();
    session.set_attribute_text("Duration", "1").unwrap();
    session.add_sibling().unwrap();
    session.set_attribute_text("Name", "pending").unwrap();

    let err = session.last_error().cloned().unwrap();
    assert!(err.to_string().contains("pending"));
    assert!(session.preview().is_empty());

    session.set_attribute_text("Duration", "0.5").unwrap();
    assert_eq!(session.preview().len(), PREVIEW_POINTS);
    assert_eq!(synthesize(&session.snapshot()).unwrap().len(), 450);
    assert_eq!(session.snapshot().roots[0].id, first);
}
