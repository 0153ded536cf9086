use anyhow::Result;
use serde_json::{json, Value};
use std::path::PathBuf;

use NestDB::copy::snapshot;
use NestDB::util::display_text;
use NestDB::{Container, Store};

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let store = Store::open_ro(&path)?;
    let tree = snapshot(&store)?;
    store.close()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree_json(&tree))?);
        return Ok(());
    }

    println!(
        "{} ({} buckets, {} entries)",
        path.display(),
        tree.container_count(),
        tree.entry_count()
    );
    // обход в глубину; детей кладём в обратном порядке, чтобы печать шла как в файле
    let mut stack: Vec<(&Container, usize)> =
        tree.sub_containers.iter().rev().map(|c| (c, 0)).collect();
    while let Some((c, depth)) = stack.pop() {
        println!(
            "{}{}/  [{} entries]",
            "  ".repeat(depth),
            display_text(&c.name),
            c.entries.len()
        );
        for sub in c.sub_containers.iter().rev() {
            stack.push((sub, depth + 1));
        }
    }
    Ok(())
}

/// JSON-массив бакетов верхнего уровня; обход без рекурсии (post-order).
fn tree_json(tree: &Container) -> Value {
    let mut stack: Vec<(&Container, usize, Vec<Value>)> = vec![(tree, 0, Vec::new())];
    while let Some((c, next, _)) = stack.last_mut() {
        let c: &Container = *c;
        if let Some(sub) = c.sub_containers.get(*next) {
            *next += 1;
            stack.push((sub, 0, Vec::new()));
            continue;
        }
        let Some((done, _, subs)) = stack.pop() else { break };
        match stack.last_mut() {
            Some((_, _, siblings)) => siblings.push(json!({
                "name": display_text(&done.name),
                "entries": done.entries.len(),
                "buckets": subs,
            })),
            None => return Value::Array(subs),
        }
    }
    Value::Array(Vec::new())
}
