//! Resources property files are loaded from
//!
//! Two kinds of location are distinguished:
//!
//! - the [`Classpath`]: resources packaged with the application, either
//!   compiled into the binary or shipped in resource directories
//! - plain filesystem paths, used for operator overrides outside the artifact

use crate::properties::{Properties, PropertiesError, decode_text};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A readable text resource
pub trait Resource: Send + Sync {
	/// Human-readable description used in logs and errors
	fn description(&self) -> String;

	/// Read the whole resource as text
	fn read_to_string(&self) -> io::Result<String>;
}

/// Packaged application resources
///
/// Lookups check embedded resources first, then each root directory in the
/// order it was added. Paths are relative to the classpath; a leading `/` is
/// ignored.
///
/// # Examples
///
/// ```
/// use encprops_conf::resource::{Classpath, Resource};
///
/// let classpath = Classpath::new()
///     .with_embedded("application.properties", "greeting=hello\n");
/// let resource = classpath.resource("/application.properties");
/// assert_eq!(resource.read_to_string().unwrap(), "greeting=hello\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Classpath {
	roots: Vec<PathBuf>,
	embedded: IndexMap<String, Cow<'static, str>>,
}

impl Classpath {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a resource root directory
	pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.roots.push(root.into());
		self
	}

	/// Register a compiled-in resource, typically from `include_str!`
	pub fn with_embedded(
		mut self,
		path: impl AsRef<str>,
		content: impl Into<Cow<'static, str>>,
	) -> Self {
		self.embedded
			.insert(normalize(path.as_ref()).to_string(), content.into());
		self
	}

	pub fn roots(&self) -> &[PathBuf] {
		&self.roots
	}

	/// A resource at `path` on this classpath
	pub fn resource(&self, path: impl Into<String>) -> ClassPathResource<'_> {
		ClassPathResource {
			classpath: self,
			path: path.into(),
		}
	}

	fn read(&self, path: &str) -> io::Result<String> {
		let path = normalize(path);
		if let Some(content) = self.embedded.get(path) {
			return Ok(content.to_string());
		}

		for root in &self.roots {
			match fs::read(root.join(path)) {
				Ok(bytes) => return Ok(decode_text(bytes)),
				Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
				Err(e) => return Err(e),
			}
		}

		Err(io::Error::new(
			io::ErrorKind::NotFound,
			format!(
				"class path resource [{}] cannot be opened because it does not exist",
				path
			),
		))
	}
}

fn normalize(path: &str) -> &str {
	path.trim_start_matches('/')
}

/// A resource looked up on a [`Classpath`]
#[derive(Debug, Clone)]
pub struct ClassPathResource<'a> {
	classpath: &'a Classpath,
	path: String,
}

impl ClassPathResource<'_> {
	pub fn path(&self) -> &str {
		&self.path
	}
}

impl Resource for ClassPathResource<'_> {
	fn description(&self) -> String {
		format!("class path resource [{}]", normalize(&self.path))
	}

	fn read_to_string(&self) -> io::Result<String> {
		self.classpath.read(&self.path)
	}
}

/// A resource at a filesystem path
#[derive(Debug, Clone)]
pub struct FileSystemResource {
	path: PathBuf,
}

impl FileSystemResource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl Resource for FileSystemResource {
	fn description(&self) -> String {
		format!("file [{}]", self.path.display())
	}

	fn read_to_string(&self) -> io::Result<String> {
		fs::read(&self.path).map(decode_text)
	}
}

impl fmt::Display for FileSystemResource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.description())
	}
}

/// Load and parse a property file from a resource
pub fn load_properties(resource: &dyn Resource) -> Result<Properties, PropertiesError> {
	let content = resource.read_to_string()?;
	Properties::parse(&content)
}
