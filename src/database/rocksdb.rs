//! RocksDB-backed document store.

use std::sync::Arc;

use rocksdb::{ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use tracing::info;

use super::{EntityKind, Store};
use crate::config::RocksConfig;
use crate::core::error::{IndexerResult, StorageError};

/// Type alias for the RocksDB instance.
pub type RocksDb = DBWithThreadMode<MultiThreaded>;

pub struct RocksStore {
    db: Arc<RocksDb>,
}

impl RocksStore {
    pub fn open(config: &RocksConfig) -> IndexerResult<Self> {
        info!(path = %config.path.display(), "opening rocksdb store");

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.max_write_buffer_number);
        if config.enable_compression {
            db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = EntityKind::all()
            .into_iter()
            .map(|kind| {
                let mut cf_opts = Options::default();
                if config.enable_compression {
                    cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                }
                ColumnFamilyDescriptor::new(kind.as_str(), cf_opts)
            })
            .collect();

        let db = RocksDb::open_cf_descriptors(&db_opts, &config.path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, kind: EntityKind) -> IndexerResult<Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db.cf_handle(kind.as_str()).ok_or_else(|| {
            StorageError::Database(format!("missing column family {}", kind.as_str())).into()
        })
    }

    pub fn flush(&self) -> IndexerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Store for RocksStore {
    fn get_raw(&self, kind: EntityKind, key: &str) -> IndexerResult<Option<Vec<u8>>> {
        let cf = self.cf(kind)?;
        Ok(self.db.get_cf(&cf, key.as_bytes())?)
    }

    fn put_raw(&self, kind: EntityKind, key: &str, value: &[u8]) -> IndexerResult<()> {
        let cf = self.cf(kind)?;
        self.db.put_cf(&cf, key.as_bytes(), value)?;
        Ok(())
    }
}
