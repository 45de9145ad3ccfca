//! Process-wide dependencies, constructed once at startup and injected into
//! every handler. Tests build their own `Runtime` against fakes or local
//! services instead of reaching for globals.

use ai_client::OpenAi;
use browserless_client::BrowserlessClient;
use diffbot_client::DiffbotClient;

use newswire_common::Config;
use newswire_store::Store;

use crate::embedder::Embedder;
use crate::keypool::KeyPool;

/// Chat model used for classification, summarization, and date extraction.
const CHAT_MODEL: &str = "gpt-4o-mini";

pub struct Runtime {
    pub config: Config,
    pub store: Store,
    pub keys: KeyPool,
    pub browserless: BrowserlessClient,
    pub diffbot: DiffbotClient,
    pub ai: OpenAi,
    /// None when embeddings are disabled by config.
    pub embedder: Option<Embedder>,
}

impl Runtime {
    pub fn new(config: Config, store: Store) -> Self {
        let ai = OpenAi::new(&config.openai_api_key, CHAT_MODEL);
        let keys = KeyPool::new(config.diffbot_keys.clone());
        let browserless =
            BrowserlessClient::new(&config.browserless_url, config.browserless_token.as_deref());
        let diffbot = DiffbotClient::new();

        let embedder = config.enable_embeddings.then(|| {
            Embedder::new(
                ai.clone(),
                &config.pinecone_api_key,
                &config.pinecone_index_host,
                config.max_concurrent_embeddings,
            )
        });

        Self {
            config,
            store,
            keys,
            browserless,
            diffbot,
            ai,
            embedder,
        }
    }
}
