pub mod lifecycle;
pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_authz::AuthService;
use libris_kernel::{InitCtx, Module};
use serde_json::json;

use lifecycle::BookLifecycle;
use routes::BooksState;

/// Catalogue, borrowing and returns.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(lifecycle: Arc<BookLifecycle>, auth: Arc<AuthService>, public_listing: bool) -> Self {
        Self {
            state: BooksState {
                lifecycle,
                auth,
                public_listing,
            },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let policy = self.state.lifecycle.policy();
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            grace_period_days = policy.grace_period_days,
            fine_per_day = policy.fine_per_day,
            strict_transitions = policy.strict_transitions,
            public_listing = self.state.public_listing,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let outcome = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookOutcome" }
                    }
                }
            })
        };
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);
        let secured = json!([{ "bearerAuth": [] }]);
        let json_body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{schema}") }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "q",
                            "in": "query",
                            "required": false,
                            "description": "Case-insensitive match on title, author or genre",
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "All matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "security": secured,
                        "requestBody": json_body("BookInput"),
                        "responses": {
                            "201": outcome("Book added"),
                            "400": error("Missing title or author"),
                            "401": error("Missing or invalid token")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Fetch one book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": error("Malformed book id"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Edit a book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "requestBody": json_body("BookEdit"),
                        "responses": {
                            "200": outcome("Book updated"),
                            "400": error("Invalid fields or malformed id"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "responses": {
                            "200": outcome("Book deleted"),
                            "400": error("Malformed book id"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found")
                        }
                    }
                },
                "/{id}/borrow": {
                    "put": {
                        "summary": "Lend a book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "requestBody": json_body("BorrowRequest"),
                        "responses": {
                            "200": outcome("Book borrowed; dueDate is set"),
                            "400": error("Borrower information is incomplete"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found"),
                            "409": error("Book is already borrowed (strict mode)")
                        }
                    }
                },
                "/{id}/return": {
                    "put": {
                        "summary": "Return a book and compute the late fine",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "requestBody": {
                            "required": false,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/ReturnRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": outcome("Book returned; fine and daysBorrowed are set"),
                            "400": error("Invalid return date or malformed id"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found"),
                            "409": error("Book is not borrowed (strict mode)")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BorrowInfo": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "department": { "type": "string" },
                            "section": { "type": "string" },
                            "borrowDate": { "type": "string", "format": "date" }
                        },
                        "required": ["name", "department", "section", "borrowDate"]
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string", "nullable": true },
                            "year": { "type": "integer", "nullable": true },
                            "description": { "type": "string", "nullable": true },
                            "available": { "type": "boolean" },
                            "borrowInfo": {
                                "allOf": [{ "$ref": "#/components/schemas/BorrowInfo" }],
                                "nullable": true
                            },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "available", "createdAt", "updatedAt"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "year": { "type": "integer" },
                            "description": { "type": "string" }
                        },
                        "required": ["title", "author"]
                    },
                    "BookEdit": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "year": { "type": "integer" },
                            "description": { "type": "string" },
                            "available": { "type": "boolean" },
                            "borrowInfo": {
                                "allOf": [{ "$ref": "#/components/schemas/BorrowInfo" }],
                                "nullable": true
                            }
                        }
                    },
                    "BorrowRequest": {
                        "type": "object",
                        "properties": {
                            "borrowInfo": { "$ref": "#/components/schemas/BorrowInfo" }
                        },
                        "required": ["borrowInfo"]
                    },
                    "ReturnRequest": {
                        "type": "object",
                        "properties": {
                            "returnDate": { "type": "string", "format": "date" }
                        }
                    },
                    "BookOutcome": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "book": { "$ref": "#/components/schemas/Book" },
                            "fine": { "type": "integer" },
                            "daysBorrowed": { "type": "integer" },
                            "dueDate": { "type": "string", "format": "date" }
                        },
                        "required": ["message", "book"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}
