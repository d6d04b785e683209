use crate::render::SourceProvider;
use crate::FileId;
use std::sync::Arc;

/// In-memory file names and text for rendering diagnostics.
///
/// `FileId`s are allocated in insertion order starting from zero.
#[derive(Clone, Debug, Default)]
pub struct SourceFiles {
  files: Vec<SourceFile>,
}

#[derive(Clone, Debug)]
struct SourceFile {
  name: Arc<str>,
  text: Arc<str>,
}

impl SourceFiles {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> FileId {
    assert!(self.files.len() < u32::MAX as usize, "file count overflow");
    let file = FileId(self.files.len() as u32);
    self.files.push(SourceFile {
      name: name.into(),
      text: text.into(),
    });
    file
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl SourceProvider for SourceFiles {
  fn file_name(&self, file: FileId) -> Option<&str> {
    self.files.get(file.0 as usize).map(|file| file.name.as_ref())
  }

  fn file_text(&self, file: FileId) -> Option<&str> {
    self.files.get(file.0 as usize).map(|file| file.text.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_follow_insertion_order() {
    let mut files = SourceFiles::new();
    let a = files.add("a.tsp", "model A {}");
    let b = files.add("b.tsp", "model B {}");
    assert_eq!(a, FileId(0));
    assert_eq!(b, FileId(1));
    assert_eq!(files.file_name(b), Some("b.tsp"));
    assert_eq!(files.file_text(FileId(9)), None);
  }
}
