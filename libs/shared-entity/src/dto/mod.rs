pub mod permission_dto;
