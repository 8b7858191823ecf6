use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Path, payload::Json};
use uuid::Uuid;

use crate::{
    application::usecases::manage_clients::ClientRequest,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::map_error,
        mappers::map_client,
        requests::ClientRequestDto,
        responses::ClientDto,
    },
};

#[derive(Clone)]
pub struct ClientsEndpoints {
    state: Arc<ApiState>,
}

impl ClientsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl ClientsEndpoints {
    #[oai(path = "/clients", method = "post", tag = EndpointsTags::Clients)]
    pub async fn create_client(
        &self,
        request: Json<ClientRequestDto>,
    ) -> PoemResult<Json<ClientDto>> {
        let client = self
            .state
            .clients_usecase
            .create(to_request(request.0))
            .await
            .map_err(map_error)?;

        Ok(Json(map_client(&client)))
    }

    #[oai(path = "/clients", method = "get", tag = EndpointsTags::Clients)]
    pub async fn list_clients(&self) -> PoemResult<Json<Vec<ClientDto>>> {
        let clients = self
            .state
            .clients_usecase
            .list()
            .await
            .map_err(map_error)?;

        Ok(Json(clients.iter().map(map_client).collect()))
    }

    #[oai(path = "/clients/:id", method = "get", tag = EndpointsTags::Clients)]
    pub async fn get_client(&self, id: Path<Uuid>) -> PoemResult<Json<ClientDto>> {
        let client = self
            .state
            .clients_usecase
            .get(id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_client(&client)))
    }

    #[oai(path = "/clients/:id", method = "put", tag = EndpointsTags::Clients)]
    pub async fn update_client(
        &self,
        id: Path<Uuid>,
        request: Json<ClientRequestDto>,
    ) -> PoemResult<Json<ClientDto>> {
        let client = self
            .state
            .clients_usecase
            .update(id.0, to_request(request.0))
            .await
            .map_err(map_error)?;

        Ok(Json(map_client(&client)))
    }

    /// Removes the client and detaches it from every campaign that is still being
    /// edited. Launched and completed campaigns keep the id in their history.
    #[oai(path = "/clients/:id", method = "delete", tag = EndpointsTags::Clients)]
    pub async fn delete_client(&self, id: Path<Uuid>) -> PoemResult<()> {
        self.state
            .clients_usecase
            .delete(id.0)
            .await
            .map_err(map_error)
    }
}

fn to_request(dto: ClientRequestDto) -> ClientRequest {
    ClientRequest {
        email: dto.email.0,
        display_name: dto.display_name,
        comment: dto.comment,
        owner_id: dto.owner_id,
    }
}
