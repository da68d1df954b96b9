use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::page;
use super::util::ensure_tmp_dir;
use crate::providers::Provider;
use crate::settings::Settings;
use crate::store::RecordStore;
use crate::translator::Translator;

/// Dependencies of the HTTP handlers, built once and injected into the router.
pub struct ServerState<P: Provider> {
    pub(crate) settings: Settings,
    pub(crate) translator: Translator<P>,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) spool_dir: PathBuf,
    pub(crate) page: String,
}

impl<P: Provider> ServerState<P> {
    pub fn new(settings: Settings, provider: P, store: Arc<dyn RecordStore>) -> Result<Self> {
        let spool_dir = ensure_tmp_dir(&settings.server)?;
        let page = page::render_index(&settings)?;
        Ok(Self {
            settings,
            translator: Translator::new(provider),
            store,
            spool_dir,
            page,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
