//! StaffService RPC handlers.

use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

use crate::models::{NewStaffMember, StaffMemberPatch};
use crate::proto::staff_service_server::StaffService;
use crate::proto::{
    CreateStaffMemberRequest, CreateStaffMemberResponse, DeleteStaffMemberRequest,
    DeleteStaffMemberResponse, GetStaffMemberRequest, GetStaffMemberResponse,
    UpdateStaffMemberRequest, UpdateStaffMemberResponse,
};
use crate::AppState;

/// gRPC implementation of the staff service.
#[derive(Clone)]
pub struct StaffApi {
    state: AppState,
}

impl StaffApi {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    async fn authenticate(&self, metadata: &MetadataMap, token: &str) -> Result<(), Status> {
        self.state
            .auth
            .check(metadata, token)
            .await
            .map_err(|e| {
                tracing::debug!("Rejected request: {}", e);
                Status::from(e)
            })
    }
}

#[tonic::async_trait]
impl StaffService for StaffApi {
    /// Look up the staff member with the given ID.
    async fn get_staff_member(
        &self,
        request: Request<GetStaffMemberRequest>,
    ) -> Result<Response<GetStaffMemberResponse>, Status> {
        self.authenticate(request.metadata(), &request.get_ref().token).await?;
        let request = request.into_inner();
        tracing::debug!(staff_id = %request.staff_id, "Received GetStaffMember request");

        let member = self.state.store.get(&request.staff_id).await?;

        Ok(Response::new(GetStaffMemberResponse {
            staff_member: Some(member.into()),
        }))
    }

    /// Create a staff member and return it with its server-assigned timestamps.
    async fn create_staff_member(
        &self,
        request: Request<CreateStaffMemberRequest>,
    ) -> Result<Response<CreateStaffMemberResponse>, Status> {
        self.authenticate(request.metadata(), &request.get_ref().token).await?;
        let request = request.into_inner();

        let member = NewStaffMember::from_wire(request.staff_member)?;
        tracing::debug!(staff_id = %member.staff_id, "Received CreateStaffMember request");

        let stored = self.state.store.add(&member).await?;
        tracing::info!(staff_id = %stored.staff_id, "Created staff member");

        Ok(Response::new(CreateStaffMemberResponse {
            staff_member: Some(stored.into()),
        }))
    }

    /// Apply a partial update and return the merged record.
    async fn update_staff_member(
        &self,
        request: Request<UpdateStaffMemberRequest>,
    ) -> Result<Response<UpdateStaffMemberResponse>, Status> {
        self.authenticate(request.metadata(), &request.get_ref().token).await?;
        let request = request.into_inner();

        let patch = StaffMemberPatch::from_wire(request.staff_member)?;
        tracing::debug!(staff_id = %patch.staff_id, "Received UpdateStaffMember request");

        let updated = self.state.store.update(&patch).await?;

        Ok(Response::new(UpdateStaffMemberResponse {
            staff_member: Some(updated.into()),
        }))
    }

    async fn delete_staff_member(
        &self,
        request: Request<DeleteStaffMemberRequest>,
    ) -> Result<Response<DeleteStaffMemberResponse>, Status> {
        self.authenticate(request.metadata(), &request.get_ref().token).await?;
        let request = request.into_inner();
        tracing::debug!(staff_id = %request.staff_id, "Received DeleteStaffMember request");

        self.state.store.delete(&request.staff_id).await?;
        tracing::info!(staff_id = %request.staff_id, "Deleted staff member");

        Ok(Response::new(DeleteStaffMemberResponse {}))
    }
}
