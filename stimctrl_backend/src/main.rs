use stimcompiler_backend::*;
use stimctrl_backend::EditorSession;

fn main() {
    let mut session = EditorSession::new(SynthConfig::default().with_seed(7));
    session.first_stimulation();
    if let Some(err) = session.last_error() {
        println!("before editing: {}", err);
    }

    session.set_attribute_text("Duration", "1.5").unwrap();
    session.set_attribute_text("Pulses", "6").unwrap();
    session.set_attribute_text("Width", "0.04").unwrap();
    session.set_attribute_text("Canal 1", "true").unwrap();

    let block = session.selection();
    session.add_child().unwrap();
    session.set_attribute_text("Type", "square").unwrap();
    session.set_attribute_text("Duration", "0.5").unwrap();
    session.set_attribute_text("Frequency", "10").unwrap();
    session.set_attribute_text("Duty", "0.5").unwrap();

    session.select(block).unwrap();
    session.set_attribute_text("Iterations", "4").unwrap();

    let preview = session.preview();
    println!(
        "preview: {} points over {:?}, peak {}",
        preview.len(),
        preview.span(),
        preview.amplitudes().iter().cloned().fold(0., f64::max)
    );
}
