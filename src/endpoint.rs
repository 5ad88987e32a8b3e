use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;

/// Returns a writable descriptor representing the physical printer sink.
/// The spooler treats the returned file as opaque — it only ever writes to
/// or closes it.
pub trait PrinterEndpoint {
    fn connect(&self, printer_name: &str, type_name: &str) -> io::Result<File>;
}

/// Stand-in for real printer hardware: each printer's output lands in its
/// own file under a spool directory, truncated on every new job.
pub struct SpoolDirEndpoint {
    dir: PathBuf,
}

impl SpoolDirEndpoint {
    pub fn new(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl PrinterEndpoint for SpoolDirEndpoint {
    fn connect(&self, printer_name: &str, _type_name: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.dir.join(format!("{printer_name}.out")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_creates_file_under_spool_dir() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = SpoolDirEndpoint::new(dir.path().to_path_buf()).unwrap();
        let _f = endpoint.connect("alice", "pdf").unwrap();
        assert!(dir.path().join("alice.out").exists());
    }
}
