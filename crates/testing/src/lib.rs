//! Integration tests spanning the core model, the in-memory identifier
//! system, the caching resolver, and the typing service.




#[cfg(test)]
mod resolver_properties {
    use std::sync::Arc;
    use std::time::Duration;

    use pidkeeper_core::TypeRegistry;
    use pidkeeper_registry::{TypeCache, TypeCacheConfig};

    use crate::support::{init_tracing, CountingRegistry};

    #[tokio::test]
    async fn n_concurrent_resolves_issue_one_registry_query() {
        init_tracing();
        let registry = CountingRegistry::new(Duration::from_millis(40));
        let cache = Arc::new(TypeCache::with_defaults(
            Arc::clone(&registry) as Arc<dyn TypeRegistry>
        ));
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                cache.resolve("type/shared").await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.query_count(), 1);
    }

    #[tokio::test]
    async fn expiry_triggers_exactly_one_refetch() {
        let registry = CountingRegistry::new(Duration::ZERO);
        let cache = TypeCache::new(
            Arc::clone(&registry) as Arc<dyn TypeRegistry>,
            TypeCacheConfig {
                capacity: 8,
                ttl: Duration::from_millis(30),
            },
        );
        cache.resolve("type/short-lived").await.unwrap();
        assert_eq!(registry.query_count(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.resolve("type/short-lived").await.unwrap();
        cache.resolve("type/short-lived").await.unwrap();
        assert_eq!(registry.query_count(), 2);
    }
}

#[cfg(test)]
mod service_properties {
    use std::sync::Arc;
    use std::time::Duration;

    use pidkeeper_core::{TypeRegistry, TypingServiceError};
    use pidkeeper_registry::TypeCache;
    use pidkeeper_service::TypingService;
    use pidkeeper_system_inmemory::InMemoryIdentifierSystem;

    use crate::support::{init_tracing, record, CountingRegistry};

    #[tokio::test]
    async fn end_to_end_validate_register_fetch() {
        init_tracing();
        let registry = CountingRegistry::new(Duration::ZERO);
        let cache = TypeCache::with_defaults(Arc::clone(&registry) as Arc<dyn TypeRegistry>);
        let service = TypingService::new(Arc::new(InMemoryIdentifierSystem::new()), cache);

        let candidate = record(&[("prop/mandatory", "v"), ("prop/extra", "w")]);
        service.validate(&candidate, ["type/profile"]).await.unwrap();

        let pid = service.register(candidate).await.unwrap();
        let typed = service.fetch_typed(&pid, "type/profile").await.unwrap();
        assert!(typed.has_property("prop/mandatory"));
        assert!(!typed.has_property("prop/extra"));

        // validate and fetch_typed shared one cached definition
        assert_eq!(registry.query_count(), 1);
    }

    #[tokio::test]
    async fn conformance_failure_names_the_culprit() {
        let registry = CountingRegistry::new(Duration::ZERO);
        let cache = TypeCache::with_defaults(Arc::clone(&registry) as Arc<dyn TypeRegistry>);
        let service = TypingService::new(Arc::new(InMemoryIdentifierSystem::new()), cache);

        let bare = record(&[("prop/optional", "v")]);
        match service.validate(&bare, ["type/profile"]).await {
            Err(TypingServiceError::Conformance {
                type_identifier,
                missing_property,
            }) => {
                assert_eq!(type_identifier, "type/profile");
                assert_eq!(missing_property, "prop/mandatory");
            }
            other => panic!("expected conformance failure, got {other:?}"),
        }
    }
}
