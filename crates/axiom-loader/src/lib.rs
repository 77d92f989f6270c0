//! Reads a canonical dataset archive (zip or unpacked directory) into a
//! `RawStream` (spec §4.1, §6).
//!
//! `nodes.csv` and `edges_obs.csv` are required; a missing one is fatal
//! (`AxiomError::MissingRequiredFile`). `edges_true.csv` and `meta.json`
//! are optional. CSV rows are read one at a time through `csv::Reader`, so
//! a single file's rows never need to be materialized all at once (spec
//! §4.1 "Performance").

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use axiom_core::model::{NodeAttrValue, NodeAttrs};
use axiom_core::{AxiomError, AxiomResult, Edge, Frame, RawStream};

const NODES_CSV: &str = "nodes.csv";
const EDGES_OBS_CSV: &str = "edges_obs.csv";
const EDGES_TRUE_CSV: &str = "edges_true.csv";
const META_JSON: &str = "meta.json";

/// Load a `RawStream` from either an unpacked directory or a zip archive
/// containing the same file set.
pub fn load(path: &Path) -> AxiomResult<RawStream> {
    tracing::info!(path = %path.display(), "loading dataset");
    let mut raw = if path.is_dir() {
        load_dir(path)?
    } else {
        load_zip(path)?
    };
    raw.meta.insert(
        "dataset_path".to_string(),
        serde_json::Value::String(path.display().to_string()),
    );
    tracing::info!(
        path = %path.display(),
        nodes = raw.nodes.len(),
        steps = raw.obs_steps.len(),
        "dataset loaded"
    );
    Ok(raw)
}

/// SHA-256 over the canonical file set's bytes, in a fixed order, so a
/// directory and the zip archive of the same contents hash identically
/// (`adapters/zip_stream.py`'s content fingerprint, examples/original_source).
fn hash_contents(files: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for bytes in files {
        hasher.update(bytes);
    }
    format!("{:x}", hasher.finalize())
}

fn load_dir(dir: &Path) -> AxiomResult<RawStream> {
    let nodes_path = dir.join(NODES_CSV);
    let edges_obs_path = dir.join(EDGES_OBS_CSV);
    if !nodes_path.exists() {
        return Err(AxiomError::MissingRequiredFile(NODES_CSV.to_string()));
    }
    if !edges_obs_path.exists() {
        return Err(AxiomError::MissingRequiredFile(EDGES_OBS_CSV.to_string()));
    }

    let nodes_bytes = std::fs::read(&nodes_path)?;
    let edges_obs_bytes = std::fs::read(&edges_obs_path)?;
    let nodes = parse_nodes_csv(nodes_bytes.as_slice(), NODES_CSV)?;
    let obs_steps = parse_edges_csv(edges_obs_bytes.as_slice(), EDGES_OBS_CSV)?;

    let edges_true_path = dir.join(EDGES_TRUE_CSV);
    let (true_steps, edges_true_bytes) = if edges_true_path.exists() {
        let bytes = std::fs::read(&edges_true_path)?;
        let steps = parse_edges_csv(bytes.as_slice(), EDGES_TRUE_CSV)?;
        (steps, bytes)
    } else {
        (Default::default(), Vec::new())
    };

    let meta_path = dir.join(META_JSON);
    let (mut meta, meta_bytes) = if meta_path.exists() {
        let mut buf = String::new();
        File::open(&meta_path)?.read_to_string(&mut buf)?;
        (parse_meta_json(&buf)?, buf.into_bytes())
    } else {
        (Default::default(), Vec::new())
    };

    meta.insert(
        "hash".to_string(),
        serde_json::Value::String(hash_contents(&[
            &nodes_bytes,
            &edges_obs_bytes,
            &edges_true_bytes,
            &meta_bytes,
        ])),
    );

    Ok(RawStream {
        nodes,
        obs_steps,
        true_steps,
        meta,
    })
}

fn load_zip(path: &Path) -> AxiomResult<RawStream> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| AxiomError::Archive(format!("{}: {e}", path.display())))?;

    let names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .collect();

    if !names.iter().any(|n| n == NODES_CSV) {
        return Err(AxiomError::MissingRequiredFile(NODES_CSV.to_string()));
    }
    if !names.iter().any(|n| n == EDGES_OBS_CSV) {
        return Err(AxiomError::MissingRequiredFile(EDGES_OBS_CSV.to_string()));
    }

    let nodes_bytes = read_zip_entry(&mut archive, NODES_CSV)?;
    let edges_obs_bytes = read_zip_entry(&mut archive, EDGES_OBS_CSV)?;
    let nodes = parse_nodes_csv(nodes_bytes.as_slice(), NODES_CSV)?;
    let obs_steps = parse_edges_csv(edges_obs_bytes.as_slice(), EDGES_OBS_CSV)?;

    let (true_steps, edges_true_bytes) = if names.iter().any(|n| n == EDGES_TRUE_CSV) {
        let bytes = read_zip_entry(&mut archive, EDGES_TRUE_CSV)?;
        let steps = parse_edges_csv(bytes.as_slice(), EDGES_TRUE_CSV)?;
        (steps, bytes)
    } else {
        (Default::default(), Vec::new())
    };

    let (mut meta, meta_bytes) = if names.iter().any(|n| n == META_JSON) {
        let bytes = read_zip_entry(&mut archive, META_JSON)?;
        let buf = String::from_utf8_lossy(&bytes).into_owned();
        (parse_meta_json(&buf)?, bytes)
    } else {
        (Default::default(), Vec::new())
    };

    meta.insert(
        "hash".to_string(),
        serde_json::Value::String(hash_contents(&[
            &nodes_bytes,
            &edges_obs_bytes,
            &edges_true_bytes,
            &meta_bytes,
        ])),
    );

    Ok(RawStream {
        nodes,
        obs_steps,
        true_steps,
        meta,
    })
}

fn read_zip_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> AxiomResult<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| AxiomError::Archive(format!("{name}: {e}")))?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

fn parse_nodes_csv(source: impl Read, file: &str) -> AxiomResult<HashMap<u64, NodeAttrs>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers().map_err(csv_err(file))?.clone();
    let mut nodes = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_err(file))?;
        let mut attrs = NodeAttrs::new();
        let mut id: Option<u64> = None;
        for (header, value) in headers.iter().zip(record.iter()) {
            if header == "id" {
                id = value.parse::<u64>().ok();
                continue;
            }
            attrs.insert(header.to_string(), infer_attr_value(value));
        }
        let id = id.ok_or_else(|| AxiomError::Archive(format!("{file}: row missing 'id'")))?;
        nodes.insert(id, attrs);
    }
    Ok(nodes)
}

fn parse_edges_csv(source: impl Read, file: &str) -> AxiomResult<std::collections::BTreeMap<u64, Frame>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers().map_err(csv_err(file))?.clone();
    let step_idx = headers.iter().position(|h| h == "step");
    let src_idx = headers.iter().position(|h| h == "src");
    let dst_idx = headers.iter().position(|h| h == "dst");

    let (step_idx, src_idx, dst_idx) = match (step_idx, src_idx, dst_idx) {
        (Some(s), Some(a), Some(b)) => (s, a, b),
        _ => {
            return Err(AxiomError::Archive(format!(
                "{file}: missing required columns step/src/dst"
            )))
        }
    };

    let mut steps: std::collections::BTreeMap<u64, Frame> = std::collections::BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_err(file))?;
        let step: u64 = record
            .get(step_idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| AxiomError::Archive(format!("{file}: invalid 'step' value")))?;
        let src: u64 = record
            .get(src_idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| AxiomError::Archive(format!("{file}: invalid 'src' value")))?;
        let dst: u64 = record
            .get(dst_idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| AxiomError::Archive(format!("{file}: invalid 'dst' value")))?;
        let edge: Edge = (src, dst);
        steps.entry(step).or_default().insert(edge);
    }
    Ok(steps)
}

fn parse_meta_json(buf: &str) -> AxiomResult<serde_json::Map<String, serde_json::Value>> {
    let value: serde_json::Value =
        serde_json::from_str(buf).map_err(|e| AxiomError::MalformedJson {
            file: META_JSON.to_string(),
            source: e,
        })?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn infer_attr_value(raw: &str) -> NodeAttrValue {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return NodeAttrValue::Json(v);
        }
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return NodeAttrValue::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return NodeAttrValue::Float(f);
    }
    NodeAttrValue::Str(raw.to_string())
}

fn csv_err(file: &str) -> impl Fn(csv::Error) -> AxiomError + '_ {
    move |source| AxiomError::MalformedCsv {
        file: file.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path) {
        std::fs::write(dir.join(NODES_CSV), "id,label\n0,a\n1,b\n2,c\n").unwrap();
        std::fs::write(
            dir.join(EDGES_OBS_CSV),
            "step,src,dst\n0,0,1\n1,0,1\n1,1,2\n",
        )
        .unwrap();
    }

    #[test]
    fn loads_directory_archive() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let raw = load(tmp.path()).unwrap();
        assert_eq!(raw.nodes.len(), 3);
        assert_eq!(raw.obs_steps.len(), 2);
        assert_eq!(raw.obs_steps[&1].len(), 2);
        assert!(raw.true_steps.is_empty());
    }

    #[test]
    fn missing_nodes_csv_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(EDGES_OBS_CSV), "step,src,dst\n0,0,1\n").unwrap();
        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(err, AxiomError::MissingRequiredFile(_)));
    }

    #[test]
    fn missing_edges_obs_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(NODES_CSV), "id,label\n0,a\n").unwrap();
        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(err, AxiomError::MissingRequiredFile(_)));
    }

    #[test]
    fn directory_and_zip_produce_equivalent_streams() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let from_dir = load(tmp.path()).unwrap();

        let zip_path = tmp.path().join("archive.zip");
        {
            let file = File::create(&zip_path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file(NODES_CSV, options).unwrap();
            zip.write_all(b"id,label\n0,a\n1,b\n2,c\n").unwrap();
            zip.start_file(EDGES_OBS_CSV, options).unwrap();
            zip.write_all(b"step,src,dst\n0,0,1\n1,0,1\n1,1,2\n").unwrap();
            zip.finish().unwrap();
        }
        let from_zip = load(&zip_path).unwrap();

        assert_eq!(from_dir.nodes, from_zip.nodes);
        assert_eq!(from_dir.obs_steps, from_zip.obs_steps);
        assert_eq!(from_dir.true_steps, from_zip.true_steps);

        let dir_hash = from_dir.meta["hash"].as_str().unwrap();
        let zip_hash = from_zip.meta["hash"].as_str().unwrap();
        assert_eq!(dir_hash.len(), 64);
        assert_eq!(dir_hash, zip_hash);
    }

    #[test]
    fn dedups_repeated_rows_within_a_step() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(NODES_CSV), "id,label\n0,a\n1,b\n").unwrap();
        std::fs::write(
            tmp.path().join(EDGES_OBS_CSV),
            "step,src,dst\n0,0,1\n0,0,1\n",
        )
        .unwrap();
        let raw = load(tmp.path()).unwrap();
        assert_eq!(raw.obs_steps[&0].len(), 1);
    }

    #[test]
    fn preserves_extra_node_columns_with_inferred_types() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(NODES_CSV),
            "id,label,weight,meta\n0,a,1.5,\"{\"\"k\"\":1}\"\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join(EDGES_OBS_CSV), "step,src,dst\n0,0,0\n").unwrap();
        // self-loop row is allowed at the raw layer; filtering happens in preprocessing
        let raw = load(tmp.path()).unwrap();
        let attrs = &raw.nodes[&0];
        assert!(matches!(attrs.get("weight"), Some(NodeAttrValue::Float(v)) if (*v - 1.5).abs() < 1e-9));
    }
}
