use std::{
  io,
  path::{Path, PathBuf},
};

/// Media types announced for known extensions. Nothing else is inspected.
const MEDIA_TYPES: [(&str, &str); 5] = [
  ("mp3", "audio/mp3"),
  ("wav", "audio/wav"),
  ("flac", "audio/flac"),
  ("ogg", "audio/ogg"),
  ("aac", "audio/aac"),
];

const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// A file handed over by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
  pub name: String,
  pub path: PathBuf,
  pub media_type: &'static str,
}

impl PickedFile {
  pub fn from_path<P: AsRef<Path>>(path: P) -> PickedFile {
    let path = path.as_ref();
    PickedFile {
      name: path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned()),
      path: path.to_path_buf(),
      media_type: media_type_for(path),
    }
  }
}

/// The declared media type for `path`, going by its extension.
pub fn media_type_for(path: &Path) -> &'static str {
  let ext = match path.extension().and_then(|e| e.to_str()) {
    Some(ext) => ext.to_ascii_lowercase(),
    None => return UNKNOWN_MEDIA_TYPE,
  };
  MEDIA_TYPES
    .iter()
    .find(|(e, _)| *e == ext)
    .map(|(_, t)| *t)
    .unwrap_or(UNKNOWN_MEDIA_TYPE)
}

/// Turns a typed path into a selection: the file itself, or every regular
/// file in a directory.
pub fn pick<P: AsRef<Path>>(path: P) -> io::Result<Vec<PickedFile>> {
  let path = path.as_ref();
  if path.is_dir() {
    let mut files = path
      .read_dir()?
      .filter_map(|e| e.ok())
      .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
      .map(|e| e.path())
      .collect::<Vec<PathBuf>>();
    files.sort();
    Ok(files.iter().map(PickedFile::from_path).collect())
  } else if path.is_file() {
    Ok(vec![PickedFile::from_path(path)])
  } else {
    Err(io::Error::new(
      io::ErrorKind::NotFound,
      format!("{} does not exist", path.display()),
    ))
  }
}

/// Picks every path, in order.
pub fn pick_all<P: AsRef<Path>>(paths: &[P]) -> io::Result<Vec<PickedFile>> {
  let mut files = vec![];
  for p in paths {
    files.append(&mut pick(p)?);
  }
  Ok(files)
}

/// The directory the prompt starts in.
pub fn get_search_dir() -> String {
  let mut dir = std::env::current_dir()
    .map(|d| d.to_string_lossy().into_owned())
    .unwrap_or_default();
  if !dir.ends_with(std::path::MAIN_SEPARATOR) {
    dir.push(std::path::MAIN_SEPARATOR);
  }
  dir
}

/// Entries next to a partially typed path whose names start with what was
/// typed so far. Directories get a trailing separator.
pub fn suggestions(query: &str, limit: usize) -> Vec<String> {
  let path = Path::new(query);
  let (dir, prefix) = if query.ends_with(std::path::MAIN_SEPARATOR) || query.is_empty() {
    (path.to_path_buf(), String::new())
  } else {
    (
      path.parent().map(Path::to_path_buf).unwrap_or_default(),
      path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default(),
    )
  };
  let dir = if dir.as_os_str().is_empty() {
    PathBuf::from(".")
  } else {
    dir
  };
  let mut names = match dir.read_dir() {
    Ok(entries) => entries
      .filter_map(|e| e.ok())
      .filter_map(|e| {
        let mut name = e.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) || (name.starts_with('.') && !prefix.starts_with('.')) {
          return None;
        }
        if e.file_type().map(|t| t.is_dir()).unwrap_or(false) {
          name.push(std::path::MAIN_SEPARATOR);
        }
        Some(name)
      })
      .collect::<Vec<String>>(),
    Err(_) => vec![],
  };
  names.sort();
  names.truncate(limit);
  names
}
