use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Path, payload::Json};
use uuid::Uuid;

use crate::{
    application::usecases::manage_messages::MessageRequest,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::map_error,
        mappers::map_message,
        requests::MessageRequestDto,
        responses::MessageDto,
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(path = "/messages", method = "post", tag = EndpointsTags::Messages)]
    pub async fn create_message(
        &self,
        request: Json<MessageRequestDto>,
    ) -> PoemResult<Json<MessageDto>> {
        let message = self
            .state
            .messages_usecase
            .create(to_request(request.0))
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_messages(&self) -> PoemResult<Json<Vec<MessageDto>>> {
        let messages = self
            .state
            .messages_usecase
            .list()
            .await
            .map_err(map_error)?;

        Ok(Json(messages.iter().map(map_message).collect()))
    }

    #[oai(path = "/messages/:id", method = "get", tag = EndpointsTags::Messages)]
    pub async fn get_message(&self, id: Path<Uuid>) -> PoemResult<Json<MessageDto>> {
        let message = self
            .state
            .messages_usecase
            .get(id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages/:id", method = "put", tag = EndpointsTags::Messages)]
    pub async fn update_message(
        &self,
        id: Path<Uuid>,
        request: Json<MessageRequestDto>,
    ) -> PoemResult<Json<MessageDto>> {
        let message = self
            .state
            .messages_usecase
            .update(id.0, to_request(request.0))
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages/:id", method = "delete", tag = EndpointsTags::Messages)]
    pub async fn delete_message(&self, id: Path<Uuid>) -> PoemResult<()> {
        self.state
            .messages_usecase
            .delete(id.0)
            .await
            .map_err(map_error)
    }
}

fn to_request(dto: MessageRequestDto) -> MessageRequest {
    MessageRequest {
        subject: dto.subject,
        body: dto.body,
        owner_id: dto.owner_id,
    }
}
