use async_trait::async_trait;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Command handler trait
#[async_trait]
pub trait CommandHandler<C>: Send + Sync {
    type Result: Send + Sync;
    type Error: std::error::Error + Send + Sync;

    async fn handle(&self, command: C) -> Result<Self::Result, Self::Error>;
}

pub type BusError = Box<dyn Error + Send + Sync>;

/// Routes each command type to its single registered handler
pub struct CommandBus {
    handlers: Arc<RwLock<HashMap<TypeId, Box<dyn CommandHandlerBox + Send + Sync>>>>,
}

#[async_trait]
trait CommandHandlerBox: Send + Sync {
    async fn handle(
        &self,
        command: Box<dyn Any + Send + Sync>,
    ) -> Result<Box<dyn Any + Send + Sync>, BusError>;
}

impl CommandBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a command handler, replacing any previous one for `C`
    pub async fn register_handler<C, H>(&self, handler: H)
    where
        C: 'static + Send + Sync,
        H: CommandHandler<C> + 'static + Send + Sync,
    {
        let boxed_handler = Box::new(HandlerWrapper::new(handler));
        let mut handlers = self.handlers.write().await;
        handlers.insert(TypeId::of::<C>(), boxed_handler);
    }

    /// Execute a command, returning the handler's result type-erased
    pub async fn execute<C>(&self, command: C) -> Result<Box<dyn Any + Send + Sync>, BusError>
    where
        C: 'static + Send + Sync,
    {
        let handlers = self.handlers.read().await;
        match handlers.get(&TypeId::of::<C>()) {
            Some(handler) => handler.handle(Box::new(command)).await,
            None => Err(format!("No handler registered for command type: {}", type_name::<C>()).into()),
        }
    }

    /// Execute a command and downcast the result to `R`
    pub async fn dispatch<C, R>(&self, command: C) -> Result<R, BusError>
    where
        C: 'static + Send + Sync,
        R: 'static,
    {
        let result = self.execute(command).await?;
        result.downcast::<R>().map(|r| *r).map_err(|_| {
            format!(
                "Handler for {} did not return {}",
                type_name::<C>(),
                type_name::<R>()
            )
            .into()
        })
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

struct HandlerWrapper<C, H> {
    handler: H,
    _phantom: std::marker::PhantomData<C>,
}

impl<C, H> HandlerWrapper<C, H> {
    fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<C, H> CommandHandlerBox for HandlerWrapper<C, H>
where
    C: 'static + Send + Sync,
    H: CommandHandler<C> + Send + Sync,
    <H as CommandHandler<C>>::Result: 'static,
    <H as CommandHandler<C>>::Error: 'static,
{
    async fn handle(
        &self,
        command: Box<dyn Any + Send + Sync>,
    ) -> Result<Box<dyn Any + Send + Sync>, BusError> {
        let command = command
            .downcast::<C>()
            .map_err(|_| "Failed to downcast command")?;

        let result = self
            .handler
            .handle(*command)
            .await
            .map_err(|e| Box::new(e) as BusError)?;

        Ok(Box::new(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command_handlers::CreateMenuItemCommandHandler;
    use crate::application::commands::{CommandFactory, MenuItemDraft};
    use crate::application::services::MenuError;
    use crate::domain::menu_item::MenuItem;
    use crate::infrastructure::InMemoryStore;

    fn draft(name: &str) -> MenuItemDraft {
        MenuItemDraft {
            name: name.to_string(),
            link: None,
            open_mode: None,
            order: 1,
            parent_id: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_command_bus_registration_and_dispatch() {
        let command_bus = CommandBus::new();
        let store = Arc::new(InMemoryStore::new());
        command_bus
            .register_handler(CreateMenuItemCommandHandler::new(store))
            .await;

        let item: MenuItem = command_bus
            .dispatch(CommandFactory::create_menu_item(draft("Home")))
            .await
            .unwrap();
        assert_eq!(item.name, "Home");
    }

    #[tokio::test]
    async fn test_handler_error_keeps_its_type() {
        let command_bus = CommandBus::new();
        let store = Arc::new(InMemoryStore::new());
        command_bus
            .register_handler(CreateMenuItemCommandHandler::new(store))
            .await;

        let err = command_bus
            .dispatch::<_, MenuItem>(CommandFactory::create_menu_item(draft("  ")))
            .await
            .unwrap_err();
        let menu_error = err.downcast_ref::<MenuError>().unwrap();
        assert_eq!(menu_error.field_errors()[0].field, "name");
    }

    #[tokio::test]
    async fn test_command_bus_no_handler() {
        let command_bus = CommandBus::new();
        let result = command_bus
            .execute(CommandFactory::delete_menu_item(1))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_with_wrong_result_type() {
        let command_bus = CommandBus::new();
        let store = Arc::new(InMemoryStore::new());
        command_bus
            .register_handler(CreateMenuItemCommandHandler::new(store))
            .await;

        let result = command_bus
            .dispatch::<_, usize>(CommandFactory::create_menu_item(draft("Home")))
            .await;
        assert!(result.is_err());
    }
}
