use stimcompiler_backend::*;

fn main() {
    let mut protocol = Protocol::new();
    let train = protocol.create_root_node(NodeName::new("train"));
    let burst = protocol.add_child(Some(train)).unwrap();
    let carrier = protocol.add_sibling(Some(burst)).unwrap();

    protocol.set_attribute(Some(train), &Attribute::Iterations(3)).unwrap();
    protocol.set_attribute(Some(train), &Attribute::Delay(0.5)).unwrap();

    protocol.set_attribute(Some(burst), &Attribute::Duration(2.)).unwrap();
    protocol.set_attribute(Some(burst), &Attribute::Pulses(8)).unwrap();
    protocol.set_attribute(Some(burst), &Attribute::Width(0.05)).unwrap();
    protocol.set_attribute(Some(burst), &Attribute::Jitter(0.02)).unwrap();

    protocol.set_attribute(Some(carrier), &Attribute::SignalType(SignalType::Square)).unwrap();
    protocol.set_attribute(Some(carrier), &Attribute::Duration(1.)).unwrap();
    protocol.set_attribute(Some(carrier), &Attribute::Frequency(20.)).unwrap();
    protocol.set_attribute(Some(carrier), &Attribute::Duty(0.3)).unwrap();

    let tree = protocol.snapshot();
    let synth = Synthesizer::new(SynthConfig::default().with_delay_policy(DelayPolicy::InsertGap));
    let preview = synth.preview(&tree).unwrap();
    println!(
        "{} leaves, {:.2}s, preview of {} points spanning {:?}",
        tree.leaf_count(),
        synth.expanded_duration(&tree).unwrap(),
        preview.len(),
        preview.span()
    );
}
