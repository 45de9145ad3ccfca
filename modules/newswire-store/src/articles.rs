//! Persistence for extracted articles.

use tracing::info;

use newswire_common::NewArticle;

use crate::error::Result;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::Store;

impl Store {
    /// Insert a processed article and return its id.
    pub async fn save_article(&self, article: &NewArticle) -> Result<i64> {
        let meta = serde_json::to_value(&article.meta_data).unwrap_or_default();

        let id = with_retry(RetryPolicy::default(), || {
            let meta = meta.clone();
            async move {
                let pool = self.pool().await;
                let id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO news_articles (
                        url, url_canonical, date, title, summary, summary_medium, summary_long,
                        topic, main_topic, topic_2, topic_3, grade, date_posted, is_embedded,
                        vector_id, full_content, meta_data, city
                    ) VALUES (
                        $1, $2, now(), $3, $4, $5, $6,
                        $7, $8, $9, $10, $11, $12, false,
                        NULL, $13, $14, $15
                    )
                    RETURNING id
                    "#,
                )
                .bind(&article.url)
                .bind(&article.url_canonical)
                .bind(&article.title)
                .bind(&article.summary_short)
                .bind(&article.summary_medium)
                .bind(&article.summary_long)
                .bind(&article.topic)
                .bind(&article.main_topic)
                .bind(&article.topic_2)
                .bind(&article.topic_3)
                .bind(article.grade)
                .bind(article.date_posted)
                .bind(&article.full_content)
                .bind(meta)
                .bind(&article.city)
                .fetch_one(&pool)
                .await?;
                Ok(id)
            }
        })
        .await?;

        info!(article_id = id, url = %article.url_canonical, "Saved article");
        Ok(id)
    }

    /// Record the vector-store id after a successful embedding.
    pub async fn update_article_embedding(&self, article_id: i64, vector_id: &str) -> Result<()> {
        let pool = self.pool().await;
        sqlx::query(
            r#"
            UPDATE news_articles
            SET is_embedded = true, vector_id = $1
            WHERE id = $2
            "#,
        )
        .bind(vector_id)
        .bind(article_id)
        .execute(&pool)
        .await?;
        Ok(())
    }
}
