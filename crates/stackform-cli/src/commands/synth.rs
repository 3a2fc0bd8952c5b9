//! `stackform synth` and `stackform plan`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use stackform_stack::Stack;
use tracing::info;

use super::config::load;

fn build(path: &str) -> Result<Stack> {
    let config = load(Path::new(path))?;
    Ok(stackform_stack::synthesize(config)?)
}

pub fn synth(path: &str, out: Option<&str>, format: &str) -> Result<()> {
    let stack = build(path)?;

    match format {
        "json" => {
            let rendered = stack.manifest()?.to_json_pretty()?;
            match out {
                Some(out) => {
                    std::fs::write(out, &rendered).with_context(|| format!("writing {out}"))?;
                    info!(path = out, resources = stack.graph().len(), "manifest written");
                    println!("✓ Synthesized {} resources to {}", stack.graph().len(), out);
                }
                None => println!("{rendered}"),
            }
        }
        "summary" => println!("{}", summary(&stack)?),
        other => bail!("unknown format `{other}` (expected json or summary)"),
    }

    Ok(())
}

pub fn plan(path: &str) -> Result<()> {
    let stack = build(path)?;
    print!("{}", format_waves(&stack));
    Ok(())
}

fn summary(stack: &Stack) -> Result<String> {
    let manifest = stack.manifest()?;
    let mut lines = vec![format!(
        "Stack {} ({}) in {}",
        stack.name(),
        stack.config().stack.environment,
        stack.config().provider.region
    )];
    for (kind, count) in stack.kind_counts() {
        lines.push(format!("  {:<40} {count}", kind.type_name()));
    }
    lines.push(format!("  handler bound: {}", stack.table().handler.is_bound()));
    lines.push(format!("  fingerprint: {}", manifest.fingerprint));
    Ok(lines.join("\n"))
}

fn format_waves(stack: &Stack) -> String {
    let mut out = String::new();
    for (i, wave) in stack.graph().waves().iter().enumerate() {
        out.push_str(&format!("wave {i}:\n"));
        for node in wave {
            out.push_str(&format!("  {}.{}\n", node.kind().type_name(), node.id()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackform_core::TopologyConfig;
    use std::fs;

    fn write_config(dir: &Path) -> String {
        let path = dir.join("stackform.toml");
        let config = TopologyConfig::scaffold("demo");
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_synth_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        let out = dir.path().join("manifest.json");

        synth(&config, Some(out.to_str().unwrap()), "json").unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["stack"], "demo");
        assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);
        assert!(json["outputs"]["vpc-data"].is_object());
    }

    #[test]
    fn test_synth_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        assert!(synth(&config, None, "yaml").is_err());
    }

    #[test]
    fn test_summary_lists_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let stack = build(&write_config(dir.path())).unwrap();
        let text = summary(&stack).unwrap();
        assert!(text.contains("aws_subnet"));
        assert!(text.contains("aws_cloudwatch_metric_alarm"));
        assert!(text.contains("handler bound: true"));
    }

    #[test]
    fn test_waves_start_with_roots() {
        let dir = tempfile::tempdir().unwrap();
        let stack = build(&write_config(dir.path())).unwrap();
        let waves = format_waves(&stack);
        let first_wave: Vec<&str> = waves
            .lines()
            .skip(1)
            .take_while(|l| l.starts_with("  "))
            .collect();
        assert!(first_wave.contains(&"  aws_vpc.vpc"));
        assert!(first_wave.contains(&"  aws_dynamodb_table.replicated-table"));
    }
}
