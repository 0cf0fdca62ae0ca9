use std::path::PathBuf;
use std::sync::Arc;

use docqa_rag::{
    CohereEmbeddingProvider, DocQaPipeline, GroqCompletionModel, RagConfig, RecursiveChunker,
    VectorStore,
};
use docqa_server::server::{AppState, ServerConfig, run_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let host = std::env::var("DOCQA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let uploads_dir = std::env::var("DOCQA_UPLOADS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("uploads"));

    tokio::fs::create_dir_all(&uploads_dir).await?;

    #[cfg(feature = "qdrant")]
    let vector_store: Arc<dyn VectorStore> = {
        let url = std::env::var("QDRANT_URL")
            .unwrap_or_else(|_| "http://localhost:6334".to_string());
        Arc::new(docqa_rag::QdrantVectorStore::new(&url)?)
    };
    #[cfg(not(feature = "qdrant"))]
    let vector_store: Arc<dyn VectorStore> = Arc::new(docqa_rag::InMemoryVectorStore::new());

    let config = RagConfig::default();
    let chunker = RecursiveChunker::new(config.chunk_size, config.chunk_overlap);

    let pipeline = DocQaPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(CohereEmbeddingProvider::from_env()?))
        .vector_store(vector_store)
        .chunker(Arc::new(chunker))
        .completion_model(Arc::new(GroqCompletionModel::from_env()?))
        .build()?;

    pipeline.ensure_collection().await?;

    let state = AppState { pipeline: Arc::new(pipeline), uploads_dir };
    run_server(ServerConfig { host, port }, state).await
}
