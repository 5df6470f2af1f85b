use uuid::Uuid;

use crate::models::{same_wire_id, Todo, User};

// In-memory user collection. Lives as long as the server; nothing is persisted.
#[derive(Debug, Default)]
pub struct Db {
    users: Vec<User>,
}
impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    // Users
    pub fn insert_user(&mut self, user: User) -> &User {
        self.users.push(user);
        &self.users[self.users.len() - 1]
    }
    pub fn username_exists(&self, username: &str) -> bool {
        self.users.iter().any(|user| user.username == username)
    }
    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }
    pub fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|user| user.id == id)
    }
    pub fn user_by_wire_id(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|user| same_wire_id(user.id, id))
    }
    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username == username)
    }
    pub fn len(&self) -> usize {
        self.users.len()
    }
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    // Todos
    pub fn push_todo(&mut self, user_id: Uuid, todo: Todo) -> Option<&Todo> {
        let user = self.user_mut(user_id)?;
        user.todos.push(todo);
        user.todos.last()
    }
    pub fn todo_mut(&mut self, user_id: Uuid, todo_id: Uuid) -> Option<&mut Todo> {
        self.user_mut(user_id)?.todo_mut(todo_id)
    }
    pub fn remove_todo(&mut self, user_id: Uuid, todo_id: Uuid) -> Option<Todo> {
        let user = self.user_mut(user_id)?;
        let index = user.todos.iter().position(|todo| todo.id == todo_id)?;
        Some(user.todos.remove(index))
    }
}
