use std::{
    hash::{Hash, Hasher},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use fxhash::{FxHashMap, FxHasher64};
use parking_lot::RwLock;

use crate::{travel_matrices::TravelMatrices, travel_matrix_provider::TravelMatrixProvider};

pub const CACHE_FOLDER_ENV_VAR: &str = "BINROUTE_CACHE_FOLDER";

fn hash_points<H, P>(points: &[P], hasher: &mut H)
where
    H: Hasher,
    for<'a> &'a P: Into<geo_types::Point>,
{
    points.len().hash(hasher);
    for point in points {
        let point = point.into();
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
}

pub fn cache_key<P>(points: &[P], provider: &TravelMatrixProvider) -> u64
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    let mut hasher = FxHasher64::default();

    hash_points(points, &mut hasher);
    provider.hash(&mut hasher);

    hasher.finish()
}

/// Cache collaborator for travel matrices. A cached matrix is never mutated
/// once stored, callers receive a shared read-only handle.
pub trait MatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: Arc<TravelMatrices>,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<Arc<TravelMatrices>>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;

    fn invalidate<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;
}

#[derive(Default, Debug, Clone, Copy)]
pub struct NoCache;

impl MatricesCache for NoCache {
    fn cache<P>(
        &self,
        _provider: &TravelMatrixProvider,
        _points: &[P],
        _matrices: Arc<TravelMatrices>,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(())
    }

    fn get_cached<P>(
        &self,
        _provider: &TravelMatrixProvider,
        _points: &[P],
    ) -> Result<Option<Arc<TravelMatrices>>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(None)
    }

    fn invalidate<P>(&self, _provider: &TravelMatrixProvider, _points: &[P]) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(())
    }
}

/// Process-wide cache, can be shared between concurrent requests.
#[derive(Default)]
pub struct InMemoryMatricesCache {
    entries: RwLock<FxHashMap<u64, Arc<TravelMatrices>>>,
}

impl InMemoryMatricesCache {
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MatricesCache for InMemoryMatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: Arc<TravelMatrices>,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let key = cache_key(points, provider);
        // First writer wins, an existing entry is never replaced
        self.entries.write().entry(key).or_insert(matrices);
        Ok(())
    }

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<Arc<TravelMatrices>>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let key = cache_key(points, provider);
        Ok(self.entries.read().get(&key).map(Arc::clone))
    }

    fn invalidate<P>(&self, provider: &TravelMatrixProvider, points: &[P]) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let key = cache_key(points, provider);
        self.entries.write().remove(&key);
        Ok(())
    }
}

/// Stores matrices as JSON files, one file per coordinate set and provider.
pub struct FileMatricesCache {
    folder: PathBuf,
}

impl FileMatricesCache {
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let folder = folder.into();

        if !folder.is_dir() {
            return Err(anyhow::anyhow!(
                "Path {} is not a directory",
                folder.display()
            ));
        }

        Ok(Self { folder })
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let cache_folder_path = std::env::var(CACHE_FOLDER_ENV_VAR)?;
        Self::new(cache_folder_path)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn file_path<P>(&self, points: &[P], provider: &TravelMatrixProvider) -> PathBuf
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        self.folder
            .join(format!("{:016x}.json", cache_key(points, provider)))
    }
}

impl MatricesCache for FileMatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: Arc<TravelMatrices>,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let file = std::fs::File::create(self.file_path(points, provider))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, matrices.as_ref())?;
        writer.flush()?;

        Ok(())
    }

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<Arc<TravelMatrices>>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let file_path = self.file_path(points, provider);

        if !file_path.is_file() {
            return Ok(None);
        }

        let file = std::fs::File::open(file_path)?;
        let matrices: TravelMatrices = serde_json::from_reader(std::io::BufReader::new(file))?;

        Ok(Some(Arc::new(matrices)))
    }

    fn invalidate<P>(&self, provider: &TravelMatrixProvider, points: &[P]) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let file_path = self.file_path(points, provider);
        if file_path.is_file() {
            std::fs::remove_file(file_path)?;
        }

        Ok(())
    }
}
