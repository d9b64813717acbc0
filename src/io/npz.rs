use anyhow::{Context, Result};
use ndarray::{Array2, ArrayD, Ix2};
use ndarray_npy::{NpzReader, NpzWriter};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Named snapshot matrices (nodes x snapshots) loaded from one `.npz` archive.
pub struct SnapshotArchive {
    matrices: HashMap<String, Array2<f64>>,
}

impl SnapshotArchive {
    pub fn load(path: &Path, required: &[&str]) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("open npz: {}", path.display()))?;
        let mut npz = NpzReader::new(f).with_context(|| format!("read npz: {}", path.display()))?;

        let mut matrices = HashMap::new();
        for key in required {
            let arr = read_f64(&mut npz, &npy_name(key))
                .with_context(|| format!("read {} from {}", key, path.display()))?;
            matrices.insert((*key).to_string(), arr);
        }
        Ok(Self { matrices })
    }

    pub fn get(&self, key: &str) -> Option<&Array2<f64>> {
        self.matrices.get(key)
    }

    pub fn require(&self, key: &str) -> Result<&Array2<f64>> {
        self.get(key).ok_or_else(|| anyhow::anyhow!("missing matrix {}", key))
    }
}

pub fn read_matrix(path: &Path, key: &str) -> Result<Array2<f64>> {
    let archive = SnapshotArchive::load(path, &[key])?;
    let arr = archive.require(key)?.clone();
    Ok(arr)
}

pub fn write_npz_f64(path: &Path, entries: &[(&str, Array2<f64>)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create npz: {}", path.display()))?;
    let mut npz = NpzWriter::new(f);
    for (name, arr) in entries {
        npz.add_array(*name, arr)
            .with_context(|| format!("write {} to {}", name, path.display()))?;
    }
    npz.finish().with_context(|| format!("finalize npz: {}", path.display()))?;
    Ok(())
}

fn npy_name(key: &str) -> String {
    format!("{key}.npy")
}

/// Reads `name` as f64, widening f32 archives.
fn read_f64<R: std::io::Read + std::io::Seek>(npz: &mut NpzReader<R>, name: &str) -> Result<Array2<f64>> {
    let wide: Result<ArrayD<f64>, _> = npz.by_name(name);
    let arr = match wide {
        Ok(arr) => arr,
        Err(_) => {
            let narrow: ArrayD<f32> = npz.by_name(name).with_context(|| format!("read {name}"))?;
            narrow.mapv(f64::from)
        }
    };
    let shape = arr.shape().to_vec();
    arr.into_dimensionality::<Ix2>()
        .with_context(|| format!("{name} must be a 2-D snapshot matrix, got shape {shape:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn matrices_survive_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("snapshots.npz");
        let u = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.5]];
        write_npz_f64(&path, &[("U", u.clone())]).expect("write");
        assert_eq!(read_matrix(&path, "U").expect("read"), u);
    }

    #[test]
    fn f32_archives_are_widened() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("narrow.npz");
        let f = File::create(&path).expect("create");
        let mut npz = NpzWriter::new(f);
        npz.add_array("V", &array![[0.5f32, 1.5], [2.0, -4.0]]).expect("add");
        npz.finish().expect("finish");
        assert_eq!(read_matrix(&path, "V").expect("read"), array![[0.5, 1.5], [2.0, -4.0]]);
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("one.npz");
        write_npz_f64(&path, &[("U", array![[1.0]])]).expect("write");
        let err = SnapshotArchive::load(&path, &["U", "V"]).err().expect("missing V");
        assert!(format!("{err:#}").contains("read V"));
    }

    #[test]
    fn non_matrix_entries_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vec.npz");
        let f = File::create(&path).expect("create");
        let mut npz = NpzWriter::new(f);
        npz.add_array("U", &array![1.0f64, 2.0, 3.0]).expect("add");
        npz.finish().expect("finish");
        assert!(read_matrix(&path, "U").is_err());
    }
}
