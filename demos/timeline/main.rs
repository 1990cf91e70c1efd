use flowlens::{ExecutionAndTasks, TaskCoordinate, TimelineBuilder, summary::FieldValue};

fn main() {
    let snapshot = ExecutionAndTasks::from_json(include_str!("./execution.json"), include_str!("./tasks.json")).unwrap();

    let mut view = TimelineBuilder::new().canvas_width(800.0).viewport_height(240.0).build();
    view.tick(1_700_000_004_000);
    view.load_snapshot(snapshot);

    println!("{}", view.graph().schema());

    view.toggle_row("prepare");
    view.toggle_row("pick");

    let layout = view.layout();
    println!("time range: {} - {}", layout.range.start, layout.range.end);
    for row in layout.rows.iter() {
        let bars: Vec<String> = row.bars.iter().map(|b| format!("[{:.0}+{:.0} {}]", b.x, b.width, b.status)).collect();
        println!("{:>6.1} {:<14} {}", row.y, row.id, bars.join(" "));
    }

    let sync = view.on_select(Some(TaskCoordinate::attempt("pick", "t-pick-1")));
    println!("selection: {:?}, scroll_top = {}", sync, view.viewport().scroll_top);

    if let Some((node, fields)) = view.selected_summary() {
        println!("summary of {}:", node.id);
        for field in fields {
            let value = match &field.value {
                FieldValue::Link {
                    path,
                    text,
                } => format!("{} ({})", text, path),
                other => other.format(),
            };
            println!("  {:<24} {}", field.label, value);
        }
    }
}
